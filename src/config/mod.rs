//! Configuration management for h2sweep.
//!
//! Provides XDG-compliant settings storage; the command line overrides any
//! value loaded from disk.

mod settings;

pub use settings::{AppSettings, Paths};
