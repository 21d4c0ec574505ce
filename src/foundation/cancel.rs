use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{StitchError, StitchResult};

/// Cooperative cancellation signal shared between a caller and a running stitch.
///
/// The stitcher checks it at every suspension point (load, seek, each render tick, sink
/// finalisation) and aborts through the normal cleanup path.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return `Err(StitchError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> StitchResult<()> {
        if self.is_cancelled() {
            return Err(StitchError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/cancel.rs"]
mod tests;
