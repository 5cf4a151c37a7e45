//! GitHub REST API access.
//!
//! # Module Structure
//!
//! - [`client`] - One authenticated client per credential
//! - [`pool`] - Credential rotation on rate limits
//! - [`pagination`] - Link-header page walking
//! - [`error`] - Error types and response classification
//! - [`types`] - The typed views the engine reads from payloads

mod client;
mod error;
mod pagination;
mod pool;
mod rate_limit;
mod types;

use std::sync::Arc;

use crate::http::HttpTransport;

pub use client::{DEFAULT_API_URL, GitHubClient, LinkPagination, PER_PAGE, parse_link_header};
pub use error::{DEFAULT_SECONDARY_RETRY_AFTER, GitHubError, classify_response, short_error_message};
pub use pagination::Paginator;
pub use pool::{
    CredentialPool, DEFAULT_EXHAUSTED_SLEEP, MIN_EXHAUSTED_SLEEP, PoolError, RateLimitAware,
    RateLimitSignal,
};
pub use rate_limit::{ApiRateLimiter, GITHUB_DEFAULT_RPS};
pub use types::{
    Account, Issue, IssueComment, Organization, Page, PullRequest, PullRequestComment,
    PullRequestReview, Remote, Repository, User,
};

/// The pool type every syncer runs against.
pub type GitHubPool = CredentialPool<GitHubClient>;

/// Options shared by every client in a pool.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// API root; `None` means [`DEFAULT_API_URL`].
    pub api_url: Option<String>,
    /// Per-credential pacing in requests per second; `0` disables pacing.
    pub requests_per_second: u32,
}

/// Build one client per non-empty token, all sharing `transport`.
pub fn pool_from_tokens<S: AsRef<str>>(
    tokens: &[S],
    transport: Arc<dyn HttpTransport>,
    options: &ClientOptions,
) -> Result<GitHubPool, PoolError> {
    let clients = tokens
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .map(|token| {
            let mut client = GitHubClient::new(token, Arc::clone(&transport));
            if let Some(url) = &options.api_url {
                client = client.with_api_url(url.clone());
            }
            if options.requests_per_second > 0 {
                client = client.with_rate_limiter(ApiRateLimiter::new(options.requests_per_second));
            }
            client
        })
        .collect();
    CredentialPool::new(clients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;

    #[test]
    fn blank_tokens_are_ignored() {
        let transport: Arc<dyn HttpTransport> = Arc::new(MockTransport::new());
        let pool = pool_from_tokens(&["a", " ", "b "], transport.clone(), &ClientOptions::default())
            .expect("two tokens");
        assert_eq!(pool.len(), 2);

        let empty = pool_from_tokens(&["", "  "], transport, &ClientOptions::default());
        assert!(matches!(empty, Err(PoolError::NoCredentials)));
    }
}
