//! Counter of outstanding work with a blocking wait for zero.

use parking_lot::{Condvar, Mutex};

/// Counts registered work units and lets a thread park until all are done.
///
/// Unlike a drop-based wait group, units can be added after a waiter has
/// started waiting, and completing a unit is an explicit call.
#[derive(Debug, Default)]
pub struct WaitGroup {
    count: Mutex<usize>,
    drained: Condvar,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more outstanding unit
    pub fn add(&self) {
        *self.count.lock() += 1;
    }

    /// Mark one unit done, waking waiters when the count reaches zero
    pub fn done(&self) {
        let mut count = self.count.lock();
        match count.checked_sub(1) {
            Some(remaining) => {
                *count = remaining;
                if remaining == 0 {
                    self.drained.notify_all();
                }
            }
            None => tracing::error!("wait group done() called with no outstanding work"),
        }
    }

    /// Block until the count is zero
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }

    /// Current number of outstanding units
    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}
