//! Backoff transport: retries requests that failed on the wire.
//!
//! Retries apply to one request at a time and only to [`HttpError`]s that
//! report a connection failure or timeout. Any HTTP response, including API
//! errors and rate-limit responses, is returned to the caller untouched.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};

use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};

/// Initial delay before the first transport retry.
pub const DEFAULT_MIN_DELAY_MS: u64 = 500;
/// Upper bound for a single backoff delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 4;

/// Configuration for retry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Set the retry count, keeping the delays.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Build the default exponential backoff strategy for transport retries.
#[must_use]
pub fn default_backoff() -> ExponentialBuilder {
    RetryConfig::default().into_backoff()
}

/// Transport decorator that retries wire-level failures with exponential
/// backoff.
#[derive(Debug, Clone)]
pub struct RetryTransport<T> {
    inner: T,
    config: RetryConfig,
}

impl<T> RetryTransport<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RetryTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let attempt = AtomicU32::new(0);
        let url = request.url.as_str();

        let op = || {
            attempt.fetch_add(1, Ordering::SeqCst);
            self.inner.send(request.clone())
        };

        op.retry(self.config.clone().into_backoff())
            .when(HttpError::is_retryable)
            .notify(|err, dur| {
                tracing::debug!(
                    url,
                    attempt = attempt.load(Ordering::SeqCst),
                    delay_ms = dur.as_millis() as u64,
                    error = %err,
                    "transport failure, retrying"
                );
            })
            .await
    }
}
