//! Cooperative cancellation.
//!
//! The CLI wires SIGINT to the [`CancelFlag`] it hands to the selected
//! miner; mining passes poll it at the head of each expansion iteration or
//! recursive call and return whatever they have computed so far. Partial
//! results are persisted normally by the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag, cheap to clone into signal handlers and workers.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    stopped: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a flag in the running state.
    pub fn new() -> Self {
        CancelFlag::default()
    }

    /// Ask every holder of this flag to stop at its next poll point.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
