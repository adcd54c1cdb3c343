//! Worker lifecycle states.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle state of a load worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Created,
    Preparing,
    Building,
    AwaitingStart,
    Running,
    Stopped,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Created => write!(f, "created"),
            LoadState::Preparing => write!(f, "preparing"),
            LoadState::Building => write!(f, "building"),
            LoadState::AwaitingStart => write!(f, "awaiting-start"),
            LoadState::Running => write!(f, "running"),
            LoadState::Stopped => write!(f, "stopped"),
        }
    }
}

/// State of one worker, readable from other threads while the worker runs.
#[derive(Debug)]
pub struct WorkerStatus {
    state: Mutex<LoadState>,
    ready: AtomicBool,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self {
            state: Mutex::new(LoadState::Created),
            ready: AtomicBool::new(false),
        }
    }
}

impl WorkerStatus {
    pub fn state(&self) -> LoadState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: LoadState) {
        *self.state.lock() = state;
    }

    /// Set once the worker has finished setup and build.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == LoadState::Stopped
    }
}
