//! Multi-credential client pool with rotation on rate limits.
//!
//! The pool holds one client per credential in a fixed ring. [`CredentialPool::request`]
//! runs an operation against the active client; when the operation reports a
//! rate limit, the pool records when that credential unblocks, rotates to the
//! next one and tries again. After a full pass in which every credential was
//! rate limited the pool sleeps until the earliest credential unblocks (capped
//! at the configured interval) and resumes with that credential.
//!
//! The lock is held only while picking or rotating the cursor, never across
//! the operation itself.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;

use crate::shutdown::{Cancelled, Shutdown};

/// Sleep applied when every credential is exhausted and none reported when
/// it unblocks. Also the cap on any computed sleep.
pub const DEFAULT_EXHAUSTED_SLEEP: Duration = Duration::from_secs(10 * 60);

/// Shortest exhaustion sleep, so a stale reset time never busy-loops.
pub const MIN_EXHAUSTED_SLEEP: Duration = Duration::from_secs(1);

/// A rate-limit condition reported by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSignal {
    /// Primary quota exhausted until `reset_at`.
    Primary { reset_at: DateTime<Utc> },
    /// Secondary limit; wait `retry_after` before using the credential again.
    Secondary { retry_after: Duration },
}

impl RateLimitSignal {
    /// How long the credential stays blocked, measured from now.
    pub fn blocked_for(&self) -> Duration {
        match self {
            RateLimitSignal::Primary { reset_at } => {
                (*reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
            }
            RateLimitSignal::Secondary { retry_after } => *retry_after,
        }
    }
}

/// Errors that can tell the pool whether they were caused by a rate limit.
pub trait RateLimitAware {
    fn rate_limit_signal(&self) -> Option<RateLimitSignal>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("at least one GitHub token is required")]
    NoCredentials,
}

struct PoolState {
    cursor: usize,
    blocked_until: Vec<Option<Instant>>,
}

/// Ring of clients, one per credential.
pub struct CredentialPool<C> {
    clients: Vec<C>,
    state: Mutex<PoolState>,
    exhausted_sleep: Duration,
    shutdown: Shutdown,
}

impl<C: Clone> CredentialPool<C> {
    pub fn new(clients: Vec<C>) -> Result<Self, PoolError> {
        if clients.is_empty() {
            return Err(PoolError::NoCredentials);
        }
        let blocked_until = vec![None; clients.len()];
        Ok(Self {
            clients,
            state: Mutex::new(PoolState {
                cursor: 0,
                blocked_until,
            }),
            exhausted_sleep: DEFAULT_EXHAUSTED_SLEEP,
            shutdown: Shutdown::new(),
        })
    }

    #[must_use]
    pub fn with_exhausted_sleep(mut self, sleep: Duration) -> Self {
        self.exhausted_sleep = sleep;
        self
    }

    /// Observe `shutdown` while sleeping on exhaustion.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Run `op` against the active client, rotating on rate limits.
    ///
    /// Non-rate-limit errors are returned immediately. Rate-limit errors are
    /// never returned: the pool keeps cycling until the operation succeeds,
    /// fails some other way, or shutdown interrupts an exhaustion sleep.
    pub async fn request<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimitAware + From<Cancelled>,
    {
        loop {
            for _ in 0..self.clients.len() {
                let (index, client) = self.active();
                match op(client).await {
                    Ok(value) => {
                        self.mark_healthy(index);
                        return Ok(value);
                    }
                    Err(err) => {
                        let Some(signal) = err.rate_limit_signal() else {
                            return Err(err);
                        };
                        tracing::warn!(
                            credential = index,
                            blocked_secs = signal.blocked_for().as_secs(),
                            "credential rate limited, rotating"
                        );
                        self.rotate_from(index, &signal);
                    }
                }
            }

            let wait = self.exhausted_wait();
            tracing::warn!(
                credentials = self.clients.len(),
                sleep_secs = wait.as_secs(),
                "all credentials rate limited, sleeping"
            );
            self.shutdown.sleep(wait).await.map_err(E::from)?;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn active(&self) -> (usize, C) {
        let state = self.lock();
        (state.cursor, self.clients[state.cursor].clone())
    }

    fn mark_healthy(&self, index: usize) {
        self.lock().blocked_until[index] = None;
    }

    /// Record the block and advance, but only if no other caller already
    /// moved the cursor away from `index`.
    fn rotate_from(&self, index: usize, signal: &RateLimitSignal) {
        let mut state = self.lock();
        state.blocked_until[index] = Some(Instant::now() + signal.blocked_for());
        if state.cursor == index {
            state.cursor = (index + 1) % self.clients.len();
        }
    }

    /// Compute the exhaustion sleep and point the cursor at the credential
    /// that unblocks first.
    fn exhausted_wait(&self) -> Duration {
        let now = Instant::now();
        let mut state = self.lock();

        let earliest = state
            .blocked_until
            .iter()
            .enumerate()
            .filter_map(|(i, until)| until.map(|u| (i, u.saturating_duration_since(now))))
            .min_by_key(|(_, remaining)| *remaining);

        match earliest {
            Some((index, remaining)) => {
                state.cursor = index;
                remaining.clamp(MIN_EXHAUSTED_SLEEP, self.exhausted_sleep.max(MIN_EXHAUSTED_SLEEP))
            }
            None => self.exhausted_sleep,
        }
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.lock().cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Limited(RateLimitSignal),
        Fatal,
        Cancelled,
    }

    impl RateLimitAware for FakeError {
        fn rate_limit_signal(&self) -> Option<RateLimitSignal> {
            match self {
                FakeError::Limited(signal) => Some(*signal),
                _ => None,
            }
        }
    }

    impl From<Cancelled> for FakeError {
        fn from(_: Cancelled) -> Self {
            FakeError::Cancelled
        }
    }

    fn secondary(secs: u64) -> FakeError {
        FakeError::Limited(RateLimitSignal::Secondary {
            retry_after: Duration::from_secs(secs),
        })
    }

    fn pool(n: usize) -> CredentialPool<usize> {
        CredentialPool::new((0..n).collect()).expect("non-empty pool")
    }

    #[test]
    fn empty_pool_is_a_configuration_error() {
        assert!(matches!(
            CredentialPool::<usize>::new(Vec::new()),
            Err(PoolError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn success_uses_active_client_without_rotation() {
        let pool = pool(3);
        let value: Result<usize, FakeError> = pool.request(|c| async move { Ok(c * 10) }).await;
        assert_eq!(value, Ok(0));
        assert_eq!(pool.cursor(), 0);
    }

    #[tokio::test]
    async fn other_errors_propagate_without_rotation() {
        let pool = pool(3);
        let calls = AtomicUsize::new(0);
        let result: Result<(), FakeError> = pool
            .request(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::Fatal) }
            })
            .await;
        assert_eq!(result, Err(FakeError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.cursor(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_credential_is_visited_once_per_pass() {
        let pool = pool(4);
        let visits = Mutex::new(Vec::new());

        let start = Instant::now();
        let result: Result<usize, FakeError> = pool
            .request(|c| {
                let mut seen = visits.lock().unwrap_or_else(|e| e.into_inner());
                seen.push(c);
                let n = seen.len();
                async move { if n <= 4 { Err(secondary(30)) } else { Ok(c) } }
            })
            .await;

        let seen = visits.into_inner().unwrap_or_else(|e| e.into_inner());
        assert_eq!(&seen[..4], &[0, 1, 2, 3]);
        assert_eq!(seen.len(), 5);
        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(30) - Duration::from_millis(1));
    }

    #[tokio::test]
    async fn rotated_credential_sticks_for_later_calls() {
        let pool = pool(2);
        let a_calls = AtomicUsize::new(0);

        let first: Result<usize, FakeError> = pool
            .request(|c| {
                if c == 0 {
                    a_calls.fetch_add(1, Ordering::SeqCst);
                }
                async move { if c == 0 { Err(secondary(60)) } else { Ok(c) } }
            })
            .await;
        assert_eq!(first, Ok(1));

        for _ in 0..3 {
            let next: Result<usize, FakeError> = pool.request(|c| async move { Ok(c) }).await;
            assert_eq!(next, Ok(1));
        }
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_sleeps_until_earliest_unblock_and_resumes_there() {
        let pool = pool(3);
        let visits = Mutex::new(Vec::new());
        let waits = [300, 45, 120];

        let start = Instant::now();
        let result: Result<usize, FakeError> = pool
            .request(|c| {
                let mut seen = visits.lock().unwrap_or_else(|e| e.into_inner());
                seen.push(c);
                let first_pass = seen.len() <= 3;
                async move { if first_pass { Err(secondary(waits[c])) } else { Ok(c) } }
            })
            .await;

        assert_eq!(result, Ok(1));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(45) - Duration::from_millis(1));
        assert!(elapsed < Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_sleep_is_capped() {
        let pool = pool(2).with_exhausted_sleep(Duration::from_secs(10));
        let calls = AtomicUsize::new(0);

        let start = Instant::now();
        let result: Result<(), FakeError> = pool
            .request(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(secondary(3600)) } else { Ok(()) } }
            })
            .await;

        assert!(result.is_ok());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10) - Duration::from_millis(1));
        assert!(elapsed < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn primary_reset_in_the_past_uses_minimum_sleep() {
        let pool = pool(1);
        let calls = AtomicUsize::new(0);
        let reset_at = Utc::now() - chrono::Duration::seconds(5);

        let result: Result<(), FakeError> = pool
            .request(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(FakeError::Limited(RateLimitSignal::Primary { reset_at }))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_exhaustion_sleep() {
        let shutdown = Shutdown::new();
        let pool = Arc::new(pool(2).with_shutdown(shutdown.clone()));

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.request();
        });

        let start = Instant::now();
        let result: Result<(), FakeError> = pool.request(|_| async { Err(secondary(600)) }).await;

        assert_eq!(result, Err(FakeError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(600));
    }

    #[tokio::test]
    async fn compare_and_rotate_ignores_stale_failures() {
        let pool = pool(3);
        let signal = RateLimitSignal::Secondary {
            retry_after: Duration::from_secs(1),
        };

        pool.rotate_from(0, &signal);
        assert_eq!(pool.cursor(), 1);

        // A second caller that also failed on credential 0 must not skip 1.
        pool.rotate_from(0, &signal);
        assert_eq!(pool.cursor(), 1);
    }
}
