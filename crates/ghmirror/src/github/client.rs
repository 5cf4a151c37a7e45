//! Authenticated GitHub REST client bound to one credential.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::{HttpRequest, HttpResponse, HttpTransport};

use super::error::{GitHubError, classify_response};
use super::rate_limit::ApiRateLimiter;
use super::types::{
    Issue, IssueComment, Organization, Page, PullRequest, PullRequestComment, PullRequestReview,
    Remote, Repository, User,
};

/// Public GitHub API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Page size for every listing.
pub const PER_PAGE: u32 = 100;

const USER_AGENT: &str = concat!("ghmirror/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Pagination info parsed from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    pub next_page: Option<u32>,
    pub last_page: Option<u32>,
}

/// Parse the Link header from a GitHub API response.
///
/// Format: `<https://api.github.com/...?page=2>; rel="next", <...?page=5>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            match rel_type {
                "next" => info.next_page = Some(page_num),
                "last" => info.last_page = Some(page_num),
                _ => {}
            }
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// One credential's view of the GitHub API.
///
/// Cloning is cheap; clones share the transport and pacing bucket.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: Arc<String>,
    api_url: Arc<String>,
    rate_limiter: Option<ApiRateLimiter>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            token: Arc::new(token.into()),
            api_url: Arc::new(DEFAULT_API_URL.to_string()),
            rate_limiter: None,
        }
    }

    /// Point the client at a GitHub Enterprise (or test) API root.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Arc::new(api_url.into().trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn get_raw(&self, route: &str) -> Result<HttpResponse, GitHubError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let request = HttpRequest::get(format!("{}{}", self.api_url, route))
            .with_header("Accept", ACCEPT)
            .with_header("User-Agent", USER_AGENT)
            .with_header("X-GitHub-Api-Version", API_VERSION)
            .with_header("Authorization", format!("Bearer {}", self.token));

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(classify_response(route, &response));
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(route: &str, body: &[u8]) -> Result<T, GitHubError> {
        serde_json::from_slice(body).map_err(|source| GitHubError::Decode {
            route: route.to_string(),
            source,
        })
    }

    /// Fetch a single object.
    pub async fn get_one<T: DeserializeOwned>(&self, route: &str) -> Result<Remote<T>, GitHubError> {
        let response = self.get_raw(route).await?;
        let payload: Value = Self::decode(route, &response.body)?;
        Remote::from_value(payload).map_err(|source| GitHubError::Decode {
            route: route.to_string(),
            source,
        })
    }

    /// Fetch one page of a listing. `route` may already carry a query string.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        route: &str,
        page: u32,
    ) -> Result<Page<Remote<T>>, GitHubError> {
        let separator = if route.contains('?') { '&' } else { '?' };
        let paged = format!("{route}{separator}per_page={PER_PAGE}&page={page}");
        let response = self.get_raw(&paged).await?;

        let next_page = response
            .header("link")
            .map(parse_link_header)
            .and_then(|links| links.next_page);

        let values: Vec<Value> = Self::decode(&paged, &response.body)?;
        let items = values
            .into_iter()
            .map(Remote::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| GitHubError::Decode {
                route: paged.clone(),
                source,
            })?;

        Ok(Page { items, next_page })
    }

    pub async fn get_organization(&self, org: &str) -> Result<Remote<Organization>, GitHubError> {
        self.get_one(&format!("/orgs/{org}")).await
    }

    pub async fn list_org_members(
        &self,
        org: &str,
        page: u32,
    ) -> Result<Page<Remote<User>>, GitHubError> {
        self.get_page(&format!("/orgs/{org}/members"), page).await
    }

    pub async fn get_user(&self, login: &str) -> Result<Remote<User>, GitHubError> {
        self.get_one(&format!("/users/{login}")).await
    }

    pub async fn list_org_repos(
        &self,
        org: &str,
        page: u32,
    ) -> Result<Page<Remote<Repository>>, GitHubError> {
        self.get_page(&format!("/orgs/{org}/repos"), page).await
    }

    pub async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Remote<Repository>, GitHubError> {
        self.get_one(&format!("/repos/{owner}/{repo}")).await
    }

    /// List issues in every state. Pull requests appear in this listing too.
    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Page<Remote<Issue>>, GitHubError> {
        self.get_page(&format!("/repos/{owner}/{repo}/issues?state=all"), page)
            .await
    }

    pub async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
    ) -> Result<Remote<Issue>, GitHubError> {
        self.get_one(&format!("/repos/{owner}/{repo}/issues/{number}"))
            .await
    }

    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Page<Remote<PullRequest>>, GitHubError> {
        self.get_page(&format!("/repos/{owner}/{repo}/pulls?state=all"), page)
            .await
    }

    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
    ) -> Result<Remote<PullRequest>, GitHubError> {
        self.get_one(&format!("/repos/{owner}/{repo}/pulls/{number}"))
            .await
    }

    /// List issue comments for one issue, or for the whole repository when
    /// `number` is `None`.
    pub async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: Option<i64>,
        page: u32,
    ) -> Result<Page<Remote<IssueComment>>, GitHubError> {
        let route = match number {
            Some(n) => format!("/repos/{owner}/{repo}/issues/{n}/comments"),
            None => format!("/repos/{owner}/{repo}/issues/comments"),
        };
        self.get_page(&route, page).await
    }

    pub async fn get_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        id: i64,
    ) -> Result<Remote<IssueComment>, GitHubError> {
        self.get_one(&format!("/repos/{owner}/{repo}/issues/comments/{id}"))
            .await
    }

    /// List review comments for one pull request, or for the whole
    /// repository when `number` is `None`.
    pub async fn list_pull_request_comments(
        &self,
        owner: &str,
        repo: &str,
        number: Option<i64>,
        page: u32,
    ) -> Result<Page<Remote<PullRequestComment>>, GitHubError> {
        let route = match number {
            Some(n) => format!("/repos/{owner}/{repo}/pulls/{n}/comments"),
            None => format!("/repos/{owner}/{repo}/pulls/comments"),
        };
        self.get_page(&route, page).await
    }

    pub async fn get_pull_request_comment(
        &self,
        owner: &str,
        repo: &str,
        id: i64,
    ) -> Result<Remote<PullRequestComment>, GitHubError> {
        self.get_one(&format!("/repos/{owner}/{repo}/pulls/comments/{id}"))
            .await
    }

    pub async fn list_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        page: u32,
    ) -> Result<Page<Remote<PullRequestReview>>, GitHubError> {
        self.get_page(&format!("/repos/{owner}/{repo}/pulls/{number}/reviews"), page)
            .await
    }

    pub async fn get_review(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        id: i64,
    ) -> Result<Remote<PullRequestReview>, GitHubError> {
        self.get_one(&format!("/repos/{owner}/{repo}/pulls/{number}/reviews/{id}"))
            .await
    }
}
