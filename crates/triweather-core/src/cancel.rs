//! Cancellation flag for the engine's background tasks.
//!
//! The cache expiry sweep and both scheduler loops run as spawned tasks that
//! must stop when the owning scope is torn down. A shared token is cheaper and
//! simpler than aborting task handles, and lets a loop finish its current
//! iteration cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clonable cancellation token for cooperative shutdown of spawned loops.
///
/// When `cancel()` is called on any clone, all clones observe it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones of this token will observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
