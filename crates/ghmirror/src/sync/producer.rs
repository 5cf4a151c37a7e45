//! Organization-wide job publishing.

use crate::entity::entity_kind::EntityKind;
use crate::queue::{JobQueue, SyncJob};

use super::context::{Counter, SyncContext};
use super::error::SyncError;
use super::issue::{IssueSyncer, PullRequestSyncer};
use super::organization::UserSyncer;
use super::repository::RepositorySyncer;
use super::types::ProduceReport;

/// Enumerates an organization's entities and publishes one job per entity.
pub struct Producer<'a, Q: ?Sized> {
    ctx: &'a SyncContext,
    queue: &'a Q,
}

impl<'a, Q: JobQueue + ?Sized> Producer<'a, Q> {
    pub fn new(ctx: &'a SyncContext, queue: &'a Q) -> Self {
        Self { ctx, queue }
    }

    /// Publish the organization, its members, its repositories, and every
    /// repository's issues and pull requests.
    ///
    /// Failing to list members, or one repository's issues or pull
    /// requests, is recorded in the report and producing continues.
    /// Failing to list repositories aborts. Shutdown always aborts.
    pub async fn queue_organization(&self, org: &str) -> Result<ProduceReport, SyncError> {
        let mut report = ProduceReport::default();
        tracing::info!(org, "producing organization");

        self.queue
            .publish_job(&SyncJob::Organization {
                login: org.to_string(),
            })
            .await?;
        self.ctx.count(org, EntityKind::Organization, Counter::Total, 1).await;
        report.add(EntityKind::Organization, 1);

        match UserSyncer::new(self.ctx).queue_children(self.queue, org).await {
            Ok(n) => report.add(EntityKind::User, n),
            Err(err) => self.record_failure(&mut report, org, err)?,
        }

        let repos = RepositorySyncer::new(self.ctx)
            .queue_children(self.queue, org)
            .await?;
        report.add(EntityKind::Repository, repos.len() as u64);

        for repo in &repos {
            self.ctx.shutdown().check()?;
            let parent = format!("{org}/{repo}");

            match IssueSyncer::new(self.ctx).queue_children(self.queue, org, repo).await {
                Ok(n) => report.add(EntityKind::Issue, n),
                Err(err) => self.record_failure(&mut report, &parent, err)?,
            }
            match PullRequestSyncer::new(self.ctx)
                .queue_children(self.queue, org, repo)
                .await
            {
                Ok(n) => report.add(EntityKind::PullRequest, n),
                Err(err) => self.record_failure(&mut report, &parent, err)?,
            }
        }

        tracing::info!(
            org,
            repositories = repos.len(),
            published = report.total_published(),
            failed_parents = report.failed_parents.len(),
            "organization produced"
        );
        Ok(report)
    }

    fn record_failure(
        &self,
        report: &mut ProduceReport,
        parent: &str,
        err: SyncError,
    ) -> Result<(), SyncError> {
        if err.is_cancelled() {
            return Err(err);
        }
        tracing::warn!(parent, error = %err, "listing failed, continuing with next parent");
        report.failed_parents.push((parent.to_string(), err.to_string()));
        Ok(())
    }
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::http::MockTransport;
    use crate::queue::MemoryQueue;
    use crate::store;
    use crate::sync::SyncOptions;
    use crate::sync::Worker;
    use crate::sync::test_support::{context, push_page, url};

    async fn drain(queue: &MemoryQueue) -> Vec<SyncJob> {
        queue.close();
        let mut jobs = Vec::new();
        while let Some(delivery) = queue.consume().await.expect("consume") {
            jobs.push(SyncJob::decode(&delivery.payload).expect("decode"));
        }
        jobs
    }

    fn repo(id: i64, name: &str) -> serde_json::Value {
        json!({"id": id, "name": name, "owner": {"id": 1, "login": "acme"}})
    }

    fn org_fixture(mock: &MockTransport) {
        push_page(mock, "/orgs/acme/members", 1, json!([{"id": 7, "login": "octo"}]), None);
        push_page(
            mock,
            "/orgs/acme/repos",
            1,
            json!([repo(1, "a"), repo(2, "b"), repo(3, "secret")]),
            None,
        );
    }

    #[tokio::test]
    async fn excluded_repositories_are_not_published() {
        let mock = MockTransport::new();
        org_fixture(&mock);
        for name in ["a", "b"] {
            push_page(&mock, &format!("/repos/acme/{name}/issues?state=all"), 1, json!([]), None);
            push_page(&mock, &format!("/repos/acme/{name}/pulls?state=all"), 1, json!([]), None);
        }
        let options = SyncOptions {
            excluded_repos: vec!["secret".to_string()],
            ..SyncOptions::default()
        };
        let ctx = context(&mock, options).await;
        let queue = MemoryQueue::new();

        let report = Producer::new(&ctx, &queue)
            .queue_organization("acme")
            .await
            .expect("produce");

        assert_eq!(report.published(EntityKind::Repository), 2);
        assert!(report.failed_parents.is_empty());
        let repos: Vec<_> = drain(&queue)
            .await
            .into_iter()
            .filter(|job| job.kind() == EntityKind::Repository)
            .collect();
        assert_eq!(
            repos,
            vec![
                SyncJob::Repository { owner: "acme".into(), name: "a".into() },
                SyncJob::Repository { owner: "acme".into(), name: "b".into() },
            ]
        );
        assert!(
            !mock
                .requests()
                .iter()
                .any(|r| r.url.contains("/repos/acme/secret/"))
        );
    }

    #[tokio::test]
    async fn issues_linked_to_pull_requests_are_skipped() {
        let mock = MockTransport::new();
        push_page(
            &mock,
            "/repos/acme/a/issues?state=all",
            1,
            json!([
                {"id": 100, "number": 1},
                {"id": 101, "number": 2, "pull_request": {"url": "https://api.github.com/repos/acme/a/pulls/2"}},
            ]),
            Some(2),
        );
        push_page(
            &mock,
            "/repos/acme/a/issues?state=all",
            2,
            json!([{"id": 102, "number": 3, "pull_request": null}]),
            None,
        );
        let ctx = context(&mock, SyncOptions::default()).await;
        let queue = MemoryQueue::new();

        let published = IssueSyncer::new(&ctx)
            .queue_children(&queue, "acme", "a")
            .await
            .expect("issues");

        assert_eq!(published, 2);
        let numbers: Vec<_> = drain(&queue)
            .await
            .into_iter()
            .map(|job| match job {
                SyncJob::Issue { number, .. } => number,
                other => panic!("unexpected job {other:?}"),
            })
            .collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_repository_listing_does_not_stop_the_organization() {
        let mock = MockTransport::new();
        org_fixture(&mock);
        push_page(
            &mock,
            "/repos/acme/a/issues?state=all",
            1,
            json!([
                {"id": 100, "number": 1},
                {"id": 101, "number": 2, "pull_request": {"url": "x"}},
            ]),
            None,
        );
        push_page(&mock, "/repos/acme/a/pulls?state=all", 1, json!([{"id": 201, "number": 2}]), None);
        mock.push_json(
            crate::sync::test_support::page_url("/repos/acme/b/issues?state=all", 1),
            500,
            json!({"message": "Server Error"}),
        );
        push_page(&mock, "/repos/acme/b/pulls?state=all", 1, json!([]), None);
        push_page(&mock, "/repos/acme/secret/issues?state=all", 1, json!([{"id": 300, "number": 9}]), None);
        push_page(&mock, "/repos/acme/secret/pulls?state=all", 1, json!([]), None);

        let ctx = context(&mock, SyncOptions::default()).await;
        let queue = MemoryQueue::new();
        let report = Producer::new(&ctx, &queue)
            .queue_organization("acme")
            .await
            .expect("produce");

        assert_eq!(report.published(EntityKind::Organization), 1);
        assert_eq!(report.published(EntityKind::User), 1);
        assert_eq!(report.published(EntityKind::Repository), 3);
        assert_eq!(report.published(EntityKind::Issue), 2);
        assert_eq!(report.published(EntityKind::PullRequest), 1);
        assert_eq!(report.failed_parents.len(), 1);
        assert_eq!(report.failed_parents[0].0, "acme/b");
        assert_eq!(drain(&queue).await.len() as u64, report.total_published());

        let status = store::status_for_org(ctx.db(), "acme").await.expect("status");
        let total = |kind: EntityKind| {
            status
                .iter()
                .find(|row| row.entity == kind)
                .map(|row| row.total)
                .unwrap_or(0)
        };
        assert_eq!(total(EntityKind::Repository), 3);
        assert_eq!(total(EntityKind::Issue), 2);
        assert_eq!(total(EntityKind::User), 1);
    }

    #[tokio::test]
    async fn repository_progress_stays_under_the_requested_org() {
        let mock = MockTransport::new();
        push_page(&mock, "/orgs/Acme/repos", 1, json!([repo(1, "a")]), None);
        mock.push_json(url("/repos/Acme/a"), 200, repo(1, "a"));
        let ctx = context(&mock, SyncOptions::default()).await;
        let queue = MemoryQueue::new();

        let queued = RepositorySyncer::new(&ctx)
            .queue_children(&queue, "Acme")
            .await
            .expect("repositories");
        assert_eq!(queued, vec!["a"]);

        queue.close();
        Worker::new(&ctx).run(&queue).await.expect("run");

        let status = store::status_for_org(ctx.db(), "Acme").await.expect("status");
        let row = status
            .iter()
            .find(|row| row.entity == EntityKind::Repository)
            .expect("repository row");
        assert_eq!((row.total, row.done, row.failed), (1, 1, 0));
        assert!(store::status_for_org(ctx.db(), "acme").await.expect("status").is_empty());
    }

    #[tokio::test]
    async fn shutdown_aborts_producing() {
        let mock = MockTransport::new();
        org_fixture(&mock);
        let ctx = context(&mock, SyncOptions::default()).await;
        ctx.shutdown().request();
        let queue = MemoryQueue::new();

        let err = Producer::new(&ctx, &queue)
            .queue_organization("acme")
            .await
            .expect_err("cancelled");
        assert!(err.is_cancelled());
    }
}
