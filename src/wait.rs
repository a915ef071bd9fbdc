//! One-shot blocking bridge between asynchronous settlement and a
//! synchronously waiting consumer.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A single-waiter cell: one thread blocks in [`WaitCell::wait`] until
/// another deposits the settled outcome with [`WaitCell::signal`].
///
/// A fresh cell is installed for every blocking retrieval and detached
/// from the promise by whichever of resolve/reject fires first.
#[derive(Debug)]
pub(crate) struct WaitCell<T> {
    slot: Mutex<Option<T>>,
    signal: Condvar,
}

impl<T> WaitCell<T> {
    pub(crate) fn new() -> Self {
        WaitCell {
            slot: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    /// Deposits `value` and wakes the waiter. Only the first signal is
    /// kept; later calls are no-ops.
    pub(crate) fn signal(&self, value: T) {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_none() {
            *slot = Some(value);
            self.signal.notify_one();
        }
    }

    /// Blocks the calling thread until the cell is signaled.
    pub(crate) fn wait(&self) -> T {
        let mut slot = self.slot.lock().unwrap();
        loop {
            match slot.take() {
                Some(value) => return value,
                None => slot = self.signal.wait(slot).unwrap(),
            }
        }
    }

    /// Blocks until the cell is signaled or `timeout` passes. `None`
    /// means the deadline won.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock().unwrap();
        loop {
            if let Some(value) = slot.take() {
                return Some(value);
            }
            let left = deadline.checked_duration_since(Instant::now())?;
            let (guard, _) = self.signal.wait_timeout(slot, left).unwrap();
            slot = guard;
        }
    }
}
