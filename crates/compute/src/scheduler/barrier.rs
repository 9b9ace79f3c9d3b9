use std::sync::{Condvar, Mutex};

use super::lock;

/// Count of submitted-but-unfinished tasks.
///
/// Waiters in [`InFlight::wait_drained`] are all woken on the transition
/// to zero.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    pub(crate) fn increment(&self) {
        *lock(&self.count) += 1;
    }

    pub(crate) fn decrement(&self) {
        let mut count = lock(&self.count);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub(crate) fn get(&self) -> usize {
        *lock(&self.count)
    }

    /// Block until the count reaches zero.
    pub(crate) fn wait_drained(&self) {
        let mut count = lock(&self.count);
        while *count > 0 {
            count = self
                .drained
                .wait(count)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}
