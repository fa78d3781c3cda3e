//! Cooperative cancellation for acquisitions

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::AcquireError;

/// Shared cancel flag; every clone observes `cancel()` on any other clone
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancelled, for use with `?` after each suspension point
    pub fn check(&self) -> Result<(), AcquireError> {
        if self.is_cancelled() {
            Err(AcquireError::Cancelled)
        } else {
            Ok(())
        }
    }
}
