//! Organization and user syncers.

use crate::entity::entity_kind::EntityKind;
use crate::entity::{organization, user};
use crate::github::GitHubClient;
use crate::queue::{JobQueue, SyncJob};
use crate::store::{self, UpsertOutcome};

use super::context::SyncContext;
use super::error::SyncError;
use super::listing::publish_listing;

pub struct OrganizationSyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> OrganizationSyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, login: &str) -> Result<UpsertOutcome, SyncError> {
        let org = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move { client.get_organization(login).await })
            .await?;
        Ok(store::upsert::<organization::Entity, _>(self.ctx.db(), &org).await?)
    }
}

pub struct UserSyncer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> UserSyncer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, login: &str) -> Result<UpsertOutcome, SyncError> {
        let user = self
            .ctx
            .pool()
            .request(|client: GitHubClient| async move { client.get_user(login).await })
            .await?;
        Ok(store::upsert::<user::Entity, _>(self.ctx.db(), &user).await?)
    }

    /// Publish one user job per member of `org`.
    pub async fn queue_children<Q: JobQueue + ?Sized>(
        &self,
        queue: &Q,
        org: &str,
    ) -> Result<u64, SyncError> {
        publish_listing(
            self.ctx,
            queue,
            org,
            org,
            EntityKind::User,
            |client: GitHubClient, page| async move { client.list_org_members(org, page).await },
            |member| {
                Some(SyncJob::User {
                    org: org.to_string(),
                    login: member.data.login.clone(),
                })
            },
        )
        .await
    }
}
