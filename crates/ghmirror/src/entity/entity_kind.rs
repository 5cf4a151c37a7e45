//! The kinds of entity the engine mirrors.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One mirrored entity kind. Used as the `entity` column of `sync_status`
/// and as the `kind` tag of queued jobs.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[sea_orm(string_value = "organization")]
    Organization,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "repository")]
    Repository,
    #[sea_orm(string_value = "issue")]
    Issue,
    #[sea_orm(string_value = "pull_request")]
    PullRequest,
    #[sea_orm(string_value = "issue_comment")]
    IssueComment,
    #[sea_orm(string_value = "pull_request_comment")]
    PullRequestComment,
    #[sea_orm(string_value = "pull_request_review")]
    PullRequestReview,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::User => "user",
            EntityKind::Repository => "repository",
            EntityKind::Issue => "issue",
            EntityKind::PullRequest => "pull_request",
            EntityKind::IssueComment => "issue_comment",
            EntityKind::PullRequestComment => "pull_request_comment",
            EntityKind::PullRequestReview => "pull_request_review",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "organization" | "org" => Ok(EntityKind::Organization),
            "user" => Ok(EntityKind::User),
            "repository" | "repo" => Ok(EntityKind::Repository),
            "issue" => Ok(EntityKind::Issue),
            "pull_request" | "pr" => Ok(EntityKind::PullRequest),
            "issue_comment" => Ok(EntityKind::IssueComment),
            "pull_request_comment" => Ok(EntityKind::PullRequestComment),
            "pull_request_review" | "review" => Ok(EntityKind::PullRequestReview),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}
