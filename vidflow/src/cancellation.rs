//! Cooperative cancellation for in-flight executions.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A token for cooperative cancellation.
///
/// Cancellation is idempotent: only the first reason is kept. Tasks observe
/// cancellation at suspension points (stage calls, backoff sleeps) and stop
/// promptly; nothing is forcibly killed.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason. The first reason wins.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
            self.notify.notify_waiters();
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Completes when cancellation is requested.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);

        // The waiter must be registered before the flag re-check, or a
        // cancel landing between the two would be missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel("deadline exceeded");
        token.cancel("second reason");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("deadline exceeded".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let token = Arc::new(CancellationToken::new());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                token.reason()
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel("shutting down");

        let reason = waiter.await.unwrap();
        assert_eq!(reason, Some("shutting down".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves_if_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel("already done");

        // Must not hang.
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }
}
