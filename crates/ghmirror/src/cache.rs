//! On-disk HTTP response cache.
//!
//! The cache is a plain byte store behind [`ResponseCache`]. Entries are keyed
//! by a SHA-256 of the request line plus the headers that select a
//! representation, so credential rotation never invalidates an entry.
//! [`CachingTransport`] revalidates cached entries with `If-None-Match`: a
//! `304 Not Modified` answer is served from disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::http::{HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Directory name used under the system temp dir when none is configured.
pub const DEFAULT_CACHE_DIR_NAME: &str = "ghmirror";

/// Request headers that change the representation returned by the API.
const VARY_HEADERS: &[&str] = &["accept", "x-github-api-version"];

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Byte store keyed by request.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;
}

/// Compute the cache key for a request.
#[must_use]
pub fn cache_key(request: &HttpRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(request.url.as_bytes());
    for name in VARY_HEADERS {
        if let Some(value) = request.header(name) {
            hasher.update(b"\n");
            hasher.update(name.as_bytes());
            hasher.update(b":");
            hasher.update(value.as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// A cache that stores one file per key in a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Cache rooted at `$TMPDIR/ghmirror`.
    pub fn in_temp_dir() -> Result<Self, CacheError> {
        Self::open(std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl ResponseCache for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        // Write-then-rename so concurrent readers never see a partial entry.
        let tmp = self
            .dir
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Serialized form of a cached response.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    headers: HttpHeaders,
    body: String,
}

impl CachedResponse {
    fn encode(response: &HttpResponse) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&CachedResponse {
            status: response.status,
            headers: response.headers.clone(),
            body: STANDARD.encode(&response.body),
        })
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<HttpResponse, CacheError> {
        let corrupt = |message: String| CacheError::Corrupt {
            key: key.to_string(),
            message,
        };
        let cached: CachedResponse =
            serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        let body = STANDARD
            .decode(cached.body)
            .map_err(|e| corrupt(e.to_string()))?;
        Ok(HttpResponse {
            status: cached.status,
            headers: cached.headers,
            body,
        })
    }
}

/// Transport decorator that consults a [`ResponseCache`] before the network.
///
/// Only GET responses carrying an `ETag` are stored. Cache failures are
/// logged and treated as misses; they never fail a request.
pub struct CachingTransport<T, C> {
    inner: T,
    cache: C,
}

impl<T, C> CachingTransport<T, C> {
    pub fn new(inner: T, cache: C) -> Self {
        Self { inner, cache }
    }
}

impl<T: HttpTransport, C: ResponseCache> CachingTransport<T, C> {
    async fn lookup(&self, key: &str) -> Option<HttpResponse> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match CachedResponse::decode(key, &bytes) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "response cache read failed");
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &HttpResponse) {
        let bytes = match CachedResponse::encode(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode response for cache");
                return;
            }
        };
        if let Err(e) = self.cache.put(key, &bytes).await {
            tracing::warn!(error = %e, "response cache write failed");
        }
    }
}

#[async_trait]
impl<T: HttpTransport, C: ResponseCache> HttpTransport for CachingTransport<T, C> {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if request.method != HttpMethod::Get {
            return self.inner.send(request).await;
        }

        let key = cache_key(&request);
        let cached = self.lookup(&key).await;

        if let Some(etag) = cached.as_ref().and_then(|c| c.header("etag"))
            && request.header("if-none-match").is_none()
        {
            request.headers.push(("If-None-Match".to_string(), etag.to_string()));
        }

        let url = request.url.clone();
        let response = self.inner.send(request).await?;

        if response.status == 304
            && let Some(cached) = cached
        {
            tracing::trace!(url = %url, "served from response cache");
            return Ok(cached);
        }

        if response.is_success() && response.header("etag").is_some() {
            self.store(&key, &response).await;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;

    const URL: &str = "https://api.github.com/repos/acme/widgets";

    fn ok_with_etag(etag: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: vec![("ETag".to_string(), etag.to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn cache_key_ignores_authorization_but_not_accept() {
        let base = HttpRequest::get(URL).with_header("Accept", "application/vnd.github+json");
        let with_token = base.clone().with_header("Authorization", "Bearer a");
        let other_token = base.clone().with_header("Authorization", "Bearer b");
        let other_accept = HttpRequest::get(URL).with_header("Accept", "text/plain");

        assert_eq!(cache_key(&with_token), cache_key(&other_token));
        assert_eq!(cache_key(&base), cache_key(&with_token));
        assert_ne!(cache_key(&base), cache_key(&other_accept));
        assert_eq!(cache_key(&base).len(), 64);
    }

    #[tokio::test]
    async fn disk_cache_round_trips_and_misses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::open(dir.path().join("nested")).expect("open cache");

        assert!(cache.get("missing").await.expect("get").is_none());
        cache.put("k", b"value").await.expect("put");
        assert_eq!(cache.get("k").await.expect("get"), Some(b"value".to_vec()));
        cache.put("k", b"newer").await.expect("overwrite");
        assert_eq!(cache.get("k").await.expect("get"), Some(b"newer".to_vec()));
    }

    #[tokio::test]
    async fn revalidates_with_etag_and_serves_304_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::open(dir.path()).expect("open cache");
        let mock = MockTransport::new();
        mock.push_response(HttpMethod::Get, URL, ok_with_etag("\"v1\"", "{\"id\":1}"));
        mock.push_response(
            HttpMethod::Get,
            URL,
            HttpResponse {
                status: 304,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );

        let transport = CachingTransport::new(mock.clone(), cache);

        let first = transport.send(HttpRequest::get(URL)).await.expect("first");
        assert_eq!(first.status, 200);

        let second = transport.send(HttpRequest::get(URL)).await.expect("second");
        assert_eq!(second.status, 200);
        assert_eq!(second.body, b"{\"id\":1}".to_vec());

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].header("if-none-match"), None);
        assert_eq!(requests[1].header("if-none-match"), Some("\"v1\""));
    }

    #[tokio::test]
    async fn responses_without_etag_or_with_errors_are_not_stored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::open(dir.path()).expect("open cache");
        let mock = MockTransport::new();
        mock.push_json(URL, 404, serde_json::json!({"message": "Not Found"}));
        mock.push_json(URL, 200, serde_json::json!({"id": 1}));

        let transport = CachingTransport::new(mock, cache.clone());
        transport.send(HttpRequest::get(URL)).await.expect("404");
        transport.send(HttpRequest::get(URL)).await.expect("200");

        let key = cache_key(&HttpRequest::get(URL));
        assert!(cache.get(&key).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn corrupt_entries_are_treated_as_misses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::open(dir.path()).expect("open cache");
        let key = cache_key(&HttpRequest::get(URL));
        cache.put(&key, b"not json").await.expect("put");

        let mock = MockTransport::new();
        mock.push_response(HttpMethod::Get, URL, ok_with_etag("\"v2\"", "{}"));
        let transport = CachingTransport::new(mock.clone(), cache);

        let resp = transport.send(HttpRequest::get(URL)).await.expect("fetch");
        assert_eq!(resp.status, 200);
        assert_eq!(mock.requests()[0].header("if-none-match"), None);
    }
}
