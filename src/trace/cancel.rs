//! Cooperative cancellation
//!
//! A cloneable signal backed by a `watch` channel. Traversals check it
//! between records and race it against in-flight fetches.

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    /// Raise the signal; every clone observes it
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in every clone, so wait_for only errors if all are gone
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        assert!(!signal.is_cancelled());
        signal.cancel();
        assert!(signal.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_already_cancelled_resolves() {
        let signal = CancelSignal::new();
        signal.cancel();
        signal.clone().cancelled().await;
    }
}
