//! Issue and pull request syncers.

use crate::entity::entity_kind::EntityKind;
use crate::entity::{issue, pull_request};
use crate::github::GitHubClient;
use crate::queue::{JobQueue, SyncJob};
use crate::store::{self, RepoScoped, UpsertOutcome};

use super::context::SyncContext;
use super::error::SyncError;
use super::listing::publish_listing;

pub struct IssueSyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> IssueSyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, owner: &str, repo: &str, number: i64) -> Result<UpsertOutcome, SyncError> {
        let item = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move { client.get_issue(owner, repo, number).await })
            .await?;
        let record = RepoScoped::new(owner, repo, item);
        Ok(store::upsert::<issue::Entity, _>(self.ctx.db(), &record).await?)
    }

    /// Publish one job per issue of `owner/repo`.
    ///
    /// The issues listing also returns pull requests; those are skipped
    /// here and queued by [`PullRequestSyncer::queue_children`].
    pub async fn queue_children<Q: JobQueue + ?Sized>(
        &self,
        queue: &Q,
        owner: &str,
        repo: &str,
    ) -> Result<u64, SyncError> {
        let parent = format!("{owner}/{repo}");
        publish_listing(
            self.ctx,
            queue,
            owner,
            &parent,
            EntityKind::Issue,
            |client: GitHubClient, page| async move { client.list_issues(owner, repo, page).await },
            |item| {
                if item.data.is_pull_request() {
                    return None;
                }
                Some(SyncJob::Issue {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    number: item.data.number,
                })
            },
        )
        .await
    }
}

pub struct PullRequestSyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> PullRequestSyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, owner: &str, repo: &str, number: i64) -> Result<UpsertOutcome, SyncError> {
        let item = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move {
                client.get_pull_request(owner, repo, number).await
            })
            .await?;
        let record = RepoScoped::new(owner, repo, item);
        Ok(store::upsert::<pull_request::Entity, _>(self.ctx.db(), &record).await?)
    }

    /// Publish one job per pull request of `owner/repo`.
    pub async fn queue_children<Q: JobQueue + ?Sized>(
        &self,
        queue: &Q,
        owner: &str,
        repo: &str,
    ) -> Result<u64, SyncError> {
        let parent = format!("{owner}/{repo}");
        publish_listing(
            self.ctx,
            queue,
            owner,
            &parent,
            EntityKind::PullRequest,
            |client: GitHubClient, page| async move {
                client.list_pull_requests(owner, repo, page).await
            },
            |item| {
                Some(SyncJob::PullRequest {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    number: item.data.number,
                })
            },
        )
        .await
    }
}
