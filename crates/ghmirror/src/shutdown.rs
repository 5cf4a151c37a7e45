//! Cooperative cancellation shared by the pool, the pagination driver and the
//! worker loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;

/// Returned by any blocking point that observed a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled by shutdown request")]
pub struct Cancelled;

/// A clonable shutdown flag with async wake-up.
///
/// Every clone observes the same flag. Requesting shutdown is idempotent.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug, Default)]
struct ShutdownInner {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    pub fn request(&self) {
        if !self.inner.requested.swap(true, Ordering::AcqRel) {
            tracing::debug!("shutdown requested");
        }
        self.inner.notify.notify_waiters();
    }

    /// Resolve once shutdown has been requested.
    pub async fn requested(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration`, returning early with [`Cancelled`] on shutdown.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if self.is_requested() {
            return Err(Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.requested() => Err(Cancelled),
        }
    }

    /// `Err(Cancelled)` if shutdown was already requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_requested() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!other.is_requested());
        assert_eq!(other.check(), Ok(()));

        shutdown.request();
        assert!(other.is_requested());
        assert_eq!(other.check(), Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_shutdown() {
        let shutdown = Shutdown::new();
        let start = tokio::time::Instant::now();
        shutdown
            .sleep(Duration::from_secs(30))
            .await
            .expect("sleep should finish");
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_interrupted_by_request() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.request();
        });

        let start = tokio::time::Instant::now();
        let result = shutdown.sleep(Duration::from_secs(600)).await;
        assert_eq!(result, Err(Cancelled));
        assert!(start.elapsed() < Duration::from_secs(600));
    }

    #[tokio::test]
    async fn sleep_after_request_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.request();
        assert_eq!(shutdown.sleep(Duration::from_secs(3600)).await, Err(Cancelled));
    }
}
