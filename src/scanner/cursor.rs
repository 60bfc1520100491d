//! Shared address cursor.
//!
//! Workers never touch the cursor; the orchestrator pulls addresses from it
//! one at a time. The cursor still serializes every read-modify-write behind
//! a mutex so that any number of callers get distinct addresses.

use crate::types::{Address, Direction};
use std::sync::{Mutex, PoisonError};

/// Stateful iterator over the IPv4 space.
///
/// The cursor starts *at* `start` and each successful [`advance`] moves it by
/// one before returning the new position, so `start` itself is never
/// yielded. Once the next position would be a sentinel (or outside the
/// 32-bit space) the cursor stays where it is and reports exhaustion.
///
/// [`advance`]: AddressCursor::advance
#[derive(Debug)]
pub struct AddressCursor {
    current: Mutex<u32>,
}

impl AddressCursor {
    pub fn new(start: Address) -> Self {
        Self {
            current: Mutex::new(start.as_u32()),
        }
    }

    /// Move one step in `direction` and return the new address, or `None`
    /// when the address space is exhausted in that direction.
    pub fn advance(&self, direction: Direction) -> Option<Address> {
        // A u32 store cannot be torn, so a poisoned lock still holds a valid value.
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        let next = Address::from_u32(*current).step(direction)?;
        if next.is_sentinel() {
            return None;
        }

        *current = next.as_u32();
        Some(next)
    }

    /// The most recently yielded address (or the start if none yet).
    pub fn current(&self) -> Address {
        Address::from_u32(*self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
