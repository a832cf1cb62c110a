//! Cooperative cancellation.
//!
//! The host metadata API may deliver projection events on multiple threads
//! and cancel them when the underlying compilation changes. Projection and
//! extraction check the token at every outer loop: type entry, each member,
//! each constructor, each type-argument recursion. A cancellation request
//! discards in-flight work without mutating prior outputs; the host drives
//! re-invocation on the next metadata change.
use {
    std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thiserror::Error,
};

/// Raised when the host cancels an in-flight pipeline run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Generation was cancelled by the host")]
pub struct Cancelled;

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Bail out of the current stage if cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
