use crate::entity::entity_kind::EntityKind;
use crate::entity::repository;
use crate::github::GitHubClient;
use crate::queue::{JobQueue, SyncJob};
use crate::store::{self, UpsertOutcome};

use super::context::SyncContext;
use super::error::SyncError;
use super::listing::publish_listing;

pub struct RepositorySyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> RepositorySyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, owner: &str, name: &str) -> Result<UpsertOutcome, SyncError> {
        let repo = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move { client.get_repository(owner, name).await })
            .await?;
        Ok(store::upsert::<repository::Entity, _>(self.ctx.db(), &repo).await?)
    }

    /// Publish one job per repository of `org` not in the excluded list.
    ///
    /// Jobs carry `org` as given, so their status counters land on the
    /// same row as the producer's totals.
    ///
    /// Returns the names of the repositories queued, in listing order.
    pub async fn queue_children<Q: JobQueue + ?Sized>(
        &self,
        queue: &Q,
        org: &str,
    ) -> Result<Vec<String>, SyncError> {
        let options = self.ctx.options();
        let mut queued = Vec::new();
        let mut skipped = 0usize;
        publish_listing(
            self.ctx,
            queue,
            org,
            org,
            EntityKind::Repository,
            |client: GitHubClient, page| async move { client.list_org_repos(org, page).await },
            |repo| {
                if options.is_excluded(&repo.data.name) {
                    skipped += 1;
                    return None;
                }
                queued.push(repo.data.name.clone());
                Some(SyncJob::Repository {
                    owner: org.to_string(),
                    name: repo.data.name.clone(),
                })
            },
        )
        .await?;

        if skipped > 0 {
            tracing::info!(org, skipped, "skipped excluded repositories");
        }
        Ok(queued)
    }
}
