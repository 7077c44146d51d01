use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ArchiveError, Result};

/// Cooperative cancellation flag shared between the coordinator and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    requested: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns `true` only for the call that set the flag.
    pub fn cancel(&self) -> bool {
        !self.requested.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Checkpoint helper for workers.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        Ok(())
    }
}
