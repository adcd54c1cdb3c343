//! One-shot start/stop signals shared between a worker and its group.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Result of waiting at the start barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Stopped,
}

/// Start and stop flags of one worker.
///
/// Both flags are monotone: once set they stay set. Reads never block.
/// Setting either flag wakes every waiter, so a thread parked at the start
/// barrier also wakes when it is asked to stop.
#[derive(Debug, Default)]
pub struct LoadSignals {
    start: AtomicBool,
    stop: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl LoadSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start flag. Returns `true` only for the call that set it.
    pub fn set_start(&self) -> bool {
        self.raise(&self.start)
    }

    /// Set the stop flag. Returns `true` only for the call that set it.
    pub fn set_stop(&self) -> bool {
        self.raise(&self.stop)
    }

    pub fn should_start(&self) -> bool {
        self.start.load(Ordering::Acquire)
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Block until start or stop is set, re-checking every `poll`.
    ///
    /// Stop wins when both are set.
    pub fn wait_for_start(&self, poll: Duration) -> StartOutcome {
        loop {
            if self.should_stop() {
                return StartOutcome::Stopped;
            }
            if self.should_start() {
                return StartOutcome::Started;
            }
            let mut guard = self.lock.lock();
            // Flags are raised under the lock, so a wakeup cannot slip in
            // between this check and the wait.
            if !self.should_start() && !self.should_stop() {
                self.cond.wait_for(&mut guard, poll);
            }
        }
    }

    /// Sleep up to `timeout`, returning early when stop is set.
    ///
    /// Returns the stop flag at wakeup.
    pub fn wait_for_stop(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.should_stop() {
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.should_stop()
    }

    fn raise(&self, flag: &AtomicBool) -> bool {
        let _guard = self.lock.lock();
        let first = !flag.swap(true, Ordering::AcqRel);
        self.cond.notify_all();
        first
    }
}
