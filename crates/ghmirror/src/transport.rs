//! Assembly of the outbound HTTP stack.
//!
//! Layers, outermost first:
//!
//! ```text
//! RetryTransport -> StripRateLimitHeaders -> CachingTransport -> ReqwestTransport
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheError, CachingTransport, DiskCache};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport, header_remove};
use crate::retry::{RetryConfig, RetryTransport};

/// Rate-limit headers removed from outgoing requests.
pub const STRIPPED_REQUEST_HEADERS: &[&str] = &[
    "X-Ratelimit-Limit",
    "X-Ratelimit-Remaining",
    "X-Ratelimit-Reset",
];

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Removes rate-limit headers from requests before they reach the cache.
#[derive(Debug, Clone)]
pub struct StripRateLimitHeaders<T> {
    inner: T,
}

impl<T> StripRateLimitHeaders<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for StripRateLimitHeaders<T> {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, HttpError> {
        for name in STRIPPED_REQUEST_HEADERS {
            header_remove(&mut request.headers, name);
        }
        self.inner.send(request).await
    }
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Disk cache directory. `None` disables response caching.
    pub cache: Option<CacheLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// `$TMPDIR/ghmirror`
    TempDir,
    Dir(std::path::PathBuf),
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
            cache: Some(CacheLocation::TempDir),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportBuildError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("failed to open response cache: {0}")]
    Cache(#[from] CacheError),
}

/// Build the full transport stack described in the module docs.
pub fn build_transport(
    options: &TransportOptions,
) -> Result<Arc<dyn HttpTransport>, TransportBuildError> {
    let network: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::with_timeout(options.timeout)?);
    let base = wrap_cache(network, options.cache.as_ref())?;
    Ok(wrap_outer(base, options.retry.clone()))
}

fn wrap_cache(
    network: Arc<dyn HttpTransport>,
    location: Option<&CacheLocation>,
) -> Result<Arc<dyn HttpTransport>, CacheError> {
    let cache = match location {
        None => return Ok(network),
        Some(CacheLocation::TempDir) => DiskCache::in_temp_dir()?,
        Some(CacheLocation::Dir(dir)) => DiskCache::open(dir.clone())?,
    };
    tracing::debug!(dir = %cache.dir().display(), "response cache enabled");
    Ok(Arc::new(CachingTransport::new(network, cache)))
}

fn wrap_outer(base: Arc<dyn HttpTransport>, retry: RetryConfig) -> Arc<dyn HttpTransport> {
    Arc::new(RetryTransport::new(StripRateLimitHeaders::new(base), retry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport};

    const URL: &str = "https://api.github.com/orgs/acme";

    #[tokio::test]
    async fn strips_rate_limit_headers_only() {
        let mock = MockTransport::new();
        mock.push_json(URL, 200, serde_json::json!({}));
        let transport = StripRateLimitHeaders::new(mock.clone());

        let request = HttpRequest::get(URL)
            .with_header("x-ratelimit-limit", "5000")
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("X-RATELIMIT-RESET", "1700000000")
            .with_header("Authorization", "Bearer t");
        transport.send(request).await.expect("send");

        let sent = &mock.requests()[0];
        assert_eq!(sent.headers.len(), 1);
        assert_eq!(sent.header("authorization"), Some("Bearer t"));
    }

    #[tokio::test(start_paused = true)]
    async fn outer_layers_retry_and_strip_together() {
        let mock = Arc::new(MockTransport::new());
        mock.push_transport_error(HttpMethod::Get, URL, "reset");
        mock.push_json(URL, 200, serde_json::json!({"login": "acme"}));

        let retry = RetryConfig::new(Duration::from_millis(1), Duration::from_millis(5), 2);
        let transport = wrap_outer(mock.clone(), retry);
        let resp = transport
            .send(HttpRequest::get(URL).with_header("X-Ratelimit-Reset", "1"))
            .await
            .expect("second attempt");

        assert_eq!(resp.status, 200);
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.header("x-ratelimit-reset").is_none()));
    }

    #[test]
    fn build_transport_with_explicit_cache_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = TransportOptions {
            cache: Some(CacheLocation::Dir(dir.path().join("cache"))),
            ..TransportOptions::default()
        };
        build_transport(&options).expect("transport builds");
        assert!(dir.path().join("cache").is_dir());
    }

    #[test]
    fn build_transport_without_cache() {
        let options = TransportOptions {
            cache: None,
            ..TransportOptions::default()
        };
        build_transport(&options).expect("transport builds");
    }
}
