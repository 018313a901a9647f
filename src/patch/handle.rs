//! Patch handle allocation.

use parking_lot::Mutex;

use super::PatchHandle;

/// Hands out patch handles in increasing order.
///
/// The counter has its own lock so allocation never contends with the patch
/// table. After `i32::MAX` it wraps back to 1; 0 is never produced.
#[derive(Debug)]
pub struct PatchHandleGenerator {
    next: Mutex<i32>,
}

impl PatchHandleGenerator {
    /// Creates a generator whose first handle is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a generator whose first handle is `first`.
    ///
    /// Values below 1 start at 1.
    pub fn starting_at(first: i32) -> Self {
        Self {
            next: Mutex::new(first.max(1)),
        }
    }

    /// Allocates the next handle.
    pub fn next_handle(&self) -> PatchHandle {
        let mut next = self.next.lock();
        let handle = PatchHandle::new(*next);
        *next = match next.checked_add(1) {
            Some(value) => value,
            None => 1,
        };
        handle
    }
}

impl Default for PatchHandleGenerator {
    fn default() -> Self {
        Self::new()
    }
}
