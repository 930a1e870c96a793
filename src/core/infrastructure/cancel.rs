//! Cooperative cancellation shared between the signal handler and core operations

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{MusicLabError, Result};

/// Cloneable cancellation signal. Cancelling any clone cancels all of them.
#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// `Cancelled` if the token already fired
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(MusicLabError::Cancelled);
        }
        Ok(())
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                // The sender lives as long as any token clone, so this is unreachable in practice
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `future` unless the token is cancelled first
    pub async fn guard<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(MusicLabError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(MusicLabError::Cancelled),
            result = future => result,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let woke = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(woke);
    }

    #[tokio::test]
    async fn test_guard_returns_cancelled() {
        let token = CancelToken::new();
        let trigger = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: Result<()> = token
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(MusicLabError::Cancelled)));
    }

    #[test]
    fn test_check() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check(), Err(MusicLabError::Cancelled)));
    }

    #[tokio::test]
    async fn test_guard_passes_through_result() {
        let token = CancelToken::new();
        let value = token.guard(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
