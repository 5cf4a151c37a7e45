//! Per-kind mapping between fetched entities and stored rows.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Condition, Set};

use crate::entity::{
    issue, issue_comment, organization, pull_request, pull_request_comment, pull_request_review,
    repository, user,
};
use crate::github::{self, Remote};

/// An entity kind the engine mirrors.
///
/// Implementors describe how to find a row by natural identity and how to
/// build a full active model from a fetched record. The row id is left
/// `NotSet`; [`super::upsert`] fills it in.
pub trait MirrorEntity: EntityTrait {
    /// What a syncer hands to the store.
    type Record: Send + Sync;

    type Active: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Clone + Send;

    fn id_column() -> Self::Column;

    /// Filter selecting the one row with the record's natural identity.
    fn identity(record: &Self::Record) -> Condition;

    /// Human-readable identity for logs and errors.
    fn describe(record: &Self::Record) -> String;

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active;
}

/// An entity listed under a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoScoped<T> {
    pub owner: String,
    pub repo: String,
    pub item: T,
}

impl<T> RepoScoped<T> {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, item: T) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            item,
        }
    }
}

/// An entity listed under a pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct PullScoped<T> {
    pub owner: String,
    pub repo: String,
    pub number: i64,
    pub item: T,
}

impl MirrorEntity for organization::Entity {
    type Record = Remote<github::Organization>;
    type Active = organization::ActiveModel;

    fn id_column() -> Self::Column {
        organization::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all().add(organization::Column::Login.eq(record.data.login.as_str()))
    }

    fn describe(record: &Self::Record) -> String {
        format!("org {}", record.data.login)
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        organization::ActiveModel {
            id: NotSet,
            login: Set(record.data.login.clone()),
            github_id: Set(record.data.id),
            name: Set(record.data.name.clone()),
            payload: Set(record.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}

impl MirrorEntity for user::Entity {
    type Record = Remote<github::User>;
    type Active = user::ActiveModel;

    fn id_column() -> Self::Column {
        user::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all().add(user::Column::GithubId.eq(record.data.id))
    }

    fn describe(record: &Self::Record) -> String {
        format!("user {} (id {})", record.data.login, record.data.id)
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        user::ActiveModel {
            id: NotSet,
            github_id: Set(record.data.id),
            login: Set(record.data.login.clone()),
            payload: Set(record.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}

impl MirrorEntity for repository::Entity {
    type Record = Remote<github::Repository>;
    type Active = repository::ActiveModel;

    fn id_column() -> Self::Column {
        repository::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all().add(repository::Column::GithubId.eq(record.data.id))
    }

    fn describe(record: &Self::Record) -> String {
        format!("repo {}/{}", record.data.owner.login, record.data.name)
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        repository::ActiveModel {
            id: NotSet,
            github_id: Set(record.data.id),
            owner: Set(record.data.owner.login.clone()),
            name: Set(record.data.name.clone()),
            payload: Set(record.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}

impl MirrorEntity for issue::Entity {
    type Record = RepoScoped<Remote<github::Issue>>;
    type Active = issue::ActiveModel;

    fn id_column() -> Self::Column {
        issue::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all()
            .add(issue::Column::RepositoryOwner.eq(record.owner.as_str()))
            .add(issue::Column::RepositoryName.eq(record.repo.as_str()))
            .add(issue::Column::Number.eq(record.item.data.number))
    }

    fn describe(record: &Self::Record) -> String {
        format!("issue {}/{}#{}", record.owner, record.repo, record.item.data.number)
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        let data = &record.item.data;
        issue::ActiveModel {
            id: NotSet,
            github_id: Set(data.id),
            repository_owner: Set(record.owner.clone()),
            repository_name: Set(record.repo.clone()),
            number: Set(data.number),
            title: Set(data.title.clone()),
            state: Set(data.state.clone()),
            payload: Set(record.item.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}

impl MirrorEntity for pull_request::Entity {
    type Record = RepoScoped<Remote<github::PullRequest>>;
    type Active = pull_request::ActiveModel;

    fn id_column() -> Self::Column {
        pull_request::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all().add(pull_request::Column::GithubId.eq(record.item.data.id))
    }

    fn describe(record: &Self::Record) -> String {
        format!("pull {}/{}#{}", record.owner, record.repo, record.item.data.number)
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        let data = &record.item.data;
        pull_request::ActiveModel {
            id: NotSet,
            github_id: Set(data.id),
            repository_owner: Set(record.owner.clone()),
            repository_name: Set(record.repo.clone()),
            number: Set(data.number),
            title: Set(data.title.clone()),
            state: Set(data.state.clone()),
            payload: Set(record.item.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}

impl MirrorEntity for issue_comment::Entity {
    type Record = RepoScoped<Remote<github::IssueComment>>;
    type Active = issue_comment::ActiveModel;

    fn id_column() -> Self::Column {
        issue_comment::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all().add(issue_comment::Column::GithubId.eq(record.item.data.id))
    }

    fn describe(record: &Self::Record) -> String {
        format!("issue comment {} in {}/{}", record.item.data.id, record.owner, record.repo)
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        issue_comment::ActiveModel {
            id: NotSet,
            github_id: Set(record.item.data.id),
            repository_owner: Set(record.owner.clone()),
            repository_name: Set(record.repo.clone()),
            issue_number: Set(record.item.data.issue_number()),
            payload: Set(record.item.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}

impl MirrorEntity for pull_request_comment::Entity {
    type Record = RepoScoped<Remote<github::PullRequestComment>>;
    type Active = pull_request_comment::ActiveModel;

    fn id_column() -> Self::Column {
        pull_request_comment::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all().add(pull_request_comment::Column::GithubId.eq(record.item.data.id))
    }

    fn describe(record: &Self::Record) -> String {
        format!("review comment {} in {}/{}", record.item.data.id, record.owner, record.repo)
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        pull_request_comment::ActiveModel {
            id: NotSet,
            github_id: Set(record.item.data.id),
            repository_owner: Set(record.owner.clone()),
            repository_name: Set(record.repo.clone()),
            pull_number: Set(record.item.data.pull_number()),
            payload: Set(record.item.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}

impl MirrorEntity for pull_request_review::Entity {
    type Record = PullScoped<Remote<github::PullRequestReview>>;
    type Active = pull_request_review::ActiveModel;

    fn id_column() -> Self::Column {
        pull_request_review::Column::Id
    }

    fn identity(record: &Self::Record) -> Condition {
        Condition::all().add(pull_request_review::Column::GithubId.eq(record.item.data.id))
    }

    fn describe(record: &Self::Record) -> String {
        format!(
            "review {} on {}/{}#{}",
            record.item.data.id, record.owner, record.repo, record.number
        )
    }

    fn build(record: &Self::Record, synced_at: DateTimeWithTimeZone) -> Self::Active {
        pull_request_review::ActiveModel {
            id: NotSet,
            github_id: Set(record.item.data.id),
            repository_owner: Set(record.owner.clone()),
            repository_name: Set(record.repo.clone()),
            pull_number: Set(record.number),
            state: Set(record.item.data.state.clone()),
            payload: Set(record.item.payload.clone()),
            synced_at: Set(synced_at),
        }
    }
}
