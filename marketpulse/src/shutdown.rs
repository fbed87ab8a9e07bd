//! Cooperative shutdown signal.
//!
//! The coordinator checks the signal between stages only; in-flight agent
//! calls within the current stage finish or time out, keeping the
//! in-flight persistence flags consistent. Requesting shutdown is
//! idempotent and the first reason wins.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default)]
struct ShutdownInner {
    requested: AtomicBool,
    reason: RwLock<Option<String>>,
}

/// Cloneable handle used to request and observe shutdown.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<ShutdownInner>,
}

impl ShutdownSignal {
    /// Creates a fresh, un-requested signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown with a reason. Only the first reason is kept.
    pub fn request(&self, reason: impl Into<String>) {
        if self
            .inner
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let reason = reason.into();
            info!(%reason, "Shutdown requested");
            *self.inner.reason.write() = Some(reason);
        }
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// The shutdown reason, if one was recorded.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner.reason.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reason_wins() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_requested());

        signal.request("operator stop");
        signal.request("second request ignored");

        assert!(signal.is_requested());
        assert_eq!(signal.reason().as_deref(), Some("operator stop"));
    }

    #[test]
    fn test_clones_share_state() {
        let signal = ShutdownSignal::new();
        let observer = signal.clone();
        signal.request("done");
        assert!(observer.is_requested());
    }
}
