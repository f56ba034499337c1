//! Cancellation coordination for long-running lookups.

use tokio::sync::watch;

/// Owner side: flips every derived [`Cancellation`] to cancelled.
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    /// Create a new, not yet cancelled source.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a token observing this source.
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side, cheap to clone.
///
/// Dropping the source without cancelling leaves tokens uncancelled forever.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        CancellationSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancelled; pend forever if the source is dropped first.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_reaches_all_tokens() {
        let source = CancellationSource::new();
        let a = source.token();
        let b = a.clone();
        assert!(!a.is_cancelled());

        let waiter = tokio::spawn(async move { b.cancelled().await });
        source.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(a.is_cancelled());
        assert!(source.is_cancelled());
    }

    #[tokio::test]
    async fn test_never_does_not_resolve() {
        let token = Cancellation::never();
        assert!(!token.is_cancelled());
        let result = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_token_created_after_cancel_sees_it() {
        let source = CancellationSource::new();
        source.cancel();
        let token = source.token();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }
}
