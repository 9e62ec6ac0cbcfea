//! Circuit breaker — a one-shot, irreversible "stop dispatching" signal.
//!
//! Closed → Tripped, never back. The first `trip` records its reason and
//! wakes anyone waiting in [`CircuitBreaker::tripped`]; later trips are no-ops.

use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    reason: OnceLock<String>,
    notify: Notify,
}

/// Cloneable handle; clones share one state.
#[derive(Clone, Default)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the breaker. Returns true only for the call that actually tripped it.
    pub fn trip(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        if self.inner.reason.set(reason).is_err() {
            return false;
        }
        self.inner.notify.notify_waiters();
        tracing::error!(reason = self.reason().unwrap_or_default(), "circuit breaker tripped");
        true
    }

    /// Non-blocking read.
    pub fn is_tripped(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// Reason given by the tripping call, if tripped.
    pub fn reason(&self) -> Option<&str> {
        self.inner.reason.get().map(String::as_str)
    }

    /// Resolve once the breaker has tripped (immediately if it already has).
    pub async fn tripped(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_tripped() {
                return;
            }
            notified.await;
        }
    }
}
