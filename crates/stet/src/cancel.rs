//! Cooperative cancellation.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::Error;

/// Ambient cancellation token passed into unmarshal/sync entry points.
///
/// The engine checks the token at component boundaries (per field, per
/// sequence element, per map entry) and returns [`Error::Canceled`] early.
/// Mutations up to that point are confined to structures the caller alone
/// holds, so no partial state is visible to other threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; all in-flight operations observing this token
    /// return [`Error::Canceled`] at their next boundary.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}
