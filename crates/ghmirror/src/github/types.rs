//! GitHub API data types.
//!
//! Each typed struct holds only the fields the engine needs for identity and
//! scope. The full provider payload travels alongside it in [`Remote`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fetched entity: the fields the engine reads plus the raw JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Remote<T> {
    pub data: T,
    pub payload: Value,
}

impl<T: DeserializeOwned> Remote<T> {
    pub fn from_value(payload: Value) -> Result<Self, serde_json::Error> {
        let data = T::deserialize(&payload)?;
        Ok(Self { data, payload })
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page to fetch next, from the `Link: rel="next"` header.
    pub next_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub owner: Account,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub number: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Present (and non-null) when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.as_ref().is_some_and(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    pub number: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: i64,
    #[serde(default)]
    pub issue_url: Option<String>,
}

impl IssueComment {
    pub fn issue_number(&self) -> Option<i64> {
        self.issue_url.as_deref().and_then(trailing_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestComment {
    pub id: i64,
    #[serde(default)]
    pub pull_request_url: Option<String>,
}

impl PullRequestComment {
    pub fn pull_number(&self) -> Option<i64> {
        self.pull_request_url.as_deref().and_then(trailing_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestReview {
    pub id: i64,
    #[serde(default)]
    pub state: Option<String>,
}

/// Parse the last path segment of an API URL as a number.
pub(crate) fn trailing_number(url: &str) -> Option<i64> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}
