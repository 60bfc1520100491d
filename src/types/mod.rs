//! Core type definitions using newtype patterns for type safety.
//!
//! These types keep raw integers and strings out of the scan engine: an
//! `Address` is always a 32-bit IPv4 value and a `Port` is always non-zero.

mod address;
mod port;

pub use address::{Address, AddressError, Direction};
pub use port::{Port, PortError};
