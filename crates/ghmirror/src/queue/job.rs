//! Queue payload format.
//!
//! A payload is a JSON object carrying a `version`, a `kind` and the
//! identity fields for that kind, e.g.
//! `{"version":1,"kind":"issue","owner":"acme","repo":"widgets","number":7}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::entity::entity_kind::EntityKind;

/// Payload version written by this build. Decoders reject anything else.
pub const CURRENT_VERSION: u32 = 1;

/// One unit of work: sync a single entity by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncJob {
    Organization { login: String },
    /// `org` is the organization the user was listed under.
    User { org: String, login: String },
    Repository { owner: String, name: String },
    Issue { owner: String, repo: String, number: i64 },
    PullRequest { owner: String, repo: String, number: i64 },
    IssueComment { owner: String, repo: String, id: i64 },
    PullRequestComment { owner: String, repo: String, id: i64 },
    PullRequestReview { owner: String, repo: String, number: i64, id: i64 },
}

#[derive(Debug, Error)]
pub enum JobDecodeError {
    #[error("unsupported job payload version {found}")]
    UnsupportedVersion { found: u64 },

    #[error("unknown job kind {0:?}")]
    UnknownKind(String),

    #[error("malformed job payload: {0}")]
    Malformed(String),
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    #[serde(flatten)]
    job: &'a SyncJob,
}

impl SyncJob {
    pub fn kind(&self) -> EntityKind {
        match self {
            SyncJob::Organization { .. } => EntityKind::Organization,
            SyncJob::User { .. } => EntityKind::User,
            SyncJob::Repository { .. } => EntityKind::Repository,
            SyncJob::Issue { .. } => EntityKind::Issue,
            SyncJob::PullRequest { .. } => EntityKind::PullRequest,
            SyncJob::IssueComment { .. } => EntityKind::IssueComment,
            SyncJob::PullRequestComment { .. } => EntityKind::PullRequestComment,
            SyncJob::PullRequestReview { .. } => EntityKind::PullRequestReview,
        }
    }

    /// The organization whose progress counters this job belongs to.
    pub fn org(&self) -> &str {
        match self {
            SyncJob::Organization { login } => login,
            SyncJob::User { org, .. } => org,
            SyncJob::Repository { owner, .. }
            | SyncJob::Issue { owner, .. }
            | SyncJob::PullRequest { owner, .. }
            | SyncJob::IssueComment { owner, .. }
            | SyncJob::PullRequestComment { owner, .. }
            | SyncJob::PullRequestReview { owner, .. } => owner,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&Envelope {
            version: CURRENT_VERSION,
            job: self,
        })
    }

    pub fn decode(payload: &[u8]) -> Result<Self, JobDecodeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| JobDecodeError::Malformed(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(JobDecodeError::Malformed("payload is not an object".into()));
        };

        let version = fields
            .remove("version")
            .ok_or_else(|| JobDecodeError::Malformed("missing version".into()))?;
        let version = version
            .as_u64()
            .ok_or_else(|| JobDecodeError::Malformed(format!("version {version} is not a number")))?;
        if version != u64::from(CURRENT_VERSION) {
            return Err(JobDecodeError::UnsupportedVersion { found: version });
        }

        let kind = fields
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| JobDecodeError::Malformed("missing kind".into()))?;
        if serde_json::from_value::<EntityKind>(Value::String(kind.to_string())).is_err() {
            return Err(JobDecodeError::UnknownKind(kind.to_string()));
        }

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| JobDecodeError::Malformed(e.to_string()))
    }
}

impl std::fmt::Display for SyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncJob::Organization { login } => write!(f, "organization {login}"),
            SyncJob::User { login, .. } => write!(f, "user {login}"),
            SyncJob::Repository { owner, name } => write!(f, "repository {owner}/{name}"),
            SyncJob::Issue { owner, repo, number } => write!(f, "issue {owner}/{repo}#{number}"),
            SyncJob::PullRequest { owner, repo, number } => {
                write!(f, "pull request {owner}/{repo}#{number}")
            }
            SyncJob::IssueComment { owner, repo, id } => {
                write!(f, "issue comment {id} in {owner}/{repo}")
            }
            SyncJob::PullRequestComment { owner, repo, id } => {
                write!(f, "review comment {id} in {owner}/{repo}")
            }
            SyncJob::PullRequestReview { owner, repo, number, id } => {
                write!(f, "review {id} on {owner}/{repo}#{number}")
            }
        }
    }
}
