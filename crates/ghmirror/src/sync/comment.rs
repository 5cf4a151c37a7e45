//! Comment and review syncers.
//!
//! Besides single-entity `sync`, these list and upsert inline for a whole
//! repository, issue or pull request, without going through a queue.

use crate::entity::entity_kind::EntityKind;
use crate::entity::{issue_comment, pull_request_comment, pull_request_review};
use crate::github::GitHubClient;
use crate::store::{self, PullScoped, RepoScoped, UpsertOutcome};

use super::context::SyncContext;
use super::error::SyncError;
use super::listing::upsert_listing;
use super::types::InlineOutcome;

pub struct IssueCommentSyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> IssueCommentSyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, owner: &str, repo: &str, id: i64) -> Result<UpsertOutcome, SyncError> {
        let comment = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move {
                client.get_issue_comment(owner, repo, id).await
            })
            .await?;
        let record = RepoScoped::new(owner, repo, comment);
        Ok(store::upsert::<issue_comment::Entity, _>(self.ctx.db(), &record).await?)
    }

    /// Every issue comment in the repository.
    pub async fn sync_repository(&self, owner: &str, repo: &str) -> InlineOutcome {
        self.sync_listing(owner, repo, None).await
    }

    /// The comments of one issue (or pull request conversation).
    pub async fn sync_issue(&self, owner: &str, repo: &str, number: i64) -> InlineOutcome {
        self.sync_listing(owner, repo, Some(number)).await
    }

    async fn sync_listing(
        &self,
        owner: &str,
        repo: &str,
        number: Option<i64>,
    ) -> InlineOutcome {
        let parent = match number {
            Some(n) => format!("{owner}/{repo}#{n}"),
            None => format!("{owner}/{repo}"),
        };
        upsert_listing::<issue_comment::Entity, _, _, _, _>(
            self.ctx,
            &parent,
            EntityKind::IssueComment,
            |client: GitHubClient, page| async move {
                client.list_issue_comments(owner, repo, number, page).await
            },
            |comment| RepoScoped::new(owner, repo, comment),
        )
        .await
    }
}

pub struct PullRequestCommentSyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> PullRequestCommentSyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, owner: &str, repo: &str, id: i64) -> Result<UpsertOutcome, SyncError> {
        let comment = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move {
                client.get_pull_request_comment(owner, repo, id).await
            })
            .await?;
        let record = RepoScoped::new(owner, repo, comment);
        Ok(store::upsert::<pull_request_comment::Entity, _>(self.ctx.db(), &record).await?)
    }

    /// Every review comment in the repository.
    pub async fn sync_repository(&self, owner: &str, repo: &str) -> InlineOutcome {
        self.sync_listing(owner, repo, None).await
    }

    /// The review comments of one pull request.
    pub async fn sync_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
    ) -> InlineOutcome {
        self.sync_listing(owner, repo, Some(number)).await
    }

    async fn sync_listing(
        &self,
        owner: &str,
        repo: &str,
        number: Option<i64>,
    ) -> InlineOutcome {
        let parent = match number {
            Some(n) => format!("{owner}/{repo}#{n}"),
            None => format!("{owner}/{repo}"),
        };
        upsert_listing::<pull_request_comment::Entity, _, _, _, _>(
            self.ctx,
            &parent,
            EntityKind::PullRequestComment,
            |client: GitHubClient, page| async move {
                client.list_pull_request_comments(owner, repo, number, page).await
            },
            |comment| RepoScoped::new(owner, repo, comment),
        )
        .await
    }
}

pub struct PullRequestReviewSyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> PullRequestReviewSyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        id: i64,
    ) -> Result<UpsertOutcome, SyncError> {
        let review = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move {
                client.get_review(owner, repo, number, id).await
            })
            .await?;
        let record = pull_scoped(owner, repo, number, review);
        Ok(store::upsert::<pull_request_review::Entity, _>(self.ctx.db(), &record).await?)
    }

    /// The reviews of one pull request.
    pub async fn sync_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
    ) -> InlineOutcome {
        let parent = format!("{owner}/{repo}#{number}");
        upsert_listing::<pull_request_review::Entity, _, _, _, _>(
            self.ctx,
            &parent,
            EntityKind::PullRequestReview,
            |client: GitHubClient, page| async move {
                client.list_reviews(owner, repo, number, page).await
            },
            |review| pull_scoped(owner, repo, number, review),
        )
        .await
    }
}

fn pull_scoped<T>(owner: &str, repo: &str, number: i64, item: T) -> PullScoped<T> {
    PullScoped {
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
        item,
    }
}
