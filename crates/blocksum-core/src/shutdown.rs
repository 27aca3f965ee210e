//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative shutdown flag shared by the scheduler and all tasks.
///
/// There is no hard preemption: tasks poll the flag at every
/// fixed-point iteration and once more after classification, and unwind
/// cleanly when it is set. Resource limiters (wall time, memory) are
/// expected to hold a clone and call [`ShutdownSignal::request`].
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative shutdown. Idempotent.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
