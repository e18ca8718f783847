/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains the bounded wait used for every completion poll.

--*/

use crate::{SbootError, SbootResult};

/// Default number of polls before a wait gives up.
pub const DEFAULT_POLL_LIMIT: u32 = 100_000;

/// Bounded retry loop with a named timeout error.
///
/// A wait polls its predicate at most `limit` times. If the predicate never
/// holds the wait fails with `timeout`; it never spins forever.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BoundedWait {
    limit: u32,
    timeout: SbootError,
}

impl BoundedWait {
    pub const fn new(limit: u32, timeout: SbootError) -> Self {
        Self { limit, timeout }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Poll `predicate` until it returns true.
    ///
    /// # Returns
    ///
    /// * `u32` - Number of polls it took, or the timeout error
    pub fn until<F>(&self, mut predicate: F) -> SbootResult<u32>
    where
        F: FnMut() -> bool,
    {
        for attempt in 1..=self.limit {
            if predicate() {
                return Ok(attempt);
            }
            core::hint::spin_loop();
        }
        Err(self.timeout)
    }
}

/// Poll `predicate` at most `limit` times.
pub fn until<F>(limit: u32, timeout: SbootError, predicate: F) -> SbootResult<u32>
where
    F: FnMut() -> bool,
{
    BoundedWait::new(limit, timeout).until(predicate)
}
