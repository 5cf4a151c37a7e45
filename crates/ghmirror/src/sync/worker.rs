//! The consumer loop.

use crate::queue::{Delivery, JobQueue, SyncJob};

use super::comment::{IssueCommentSyncer, PullRequestCommentSyncer, PullRequestReviewSyncer};
use super::context::{Counter, SyncContext};
use super::error::SyncError;
use super::issue::{IssueSyncer, PullRequestSyncer};
use super::organization::{OrganizationSyncer, UserSyncer};
use super::progress::SyncProgress;
use super::repository::RepositorySyncer;
use super::types::WorkReport;

/// Consumes jobs and runs the matching syncer.
///
/// Every delivery is acknowledged once processed, whether the sync
/// succeeded or failed. Jobs are never retried by the worker.
pub struct Worker<'a> {
    ctx: &'a SyncContext,
}

impl<'a> Worker<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    /// Consume until the queue reports nothing more or shutdown is requested.
    ///
    /// A job interrupted by shutdown is left unacknowledged.
    pub async fn run<Q: JobQueue + ?Sized>(&self, queue: &Q) -> Result<WorkReport, SyncError> {
        let shutdown = self.ctx.shutdown();
        let mut report = WorkReport::default();

        loop {
            if shutdown.is_requested() {
                tracing::info!("shutdown requested, worker stopping");
                break;
            }

            let delivery = tokio::select! {
                delivery = queue.consume() => delivery?,
                _ = shutdown.requested() => {
                    tracing::info!("shutdown requested, worker stopping");
                    break;
                }
            };
            let Some(delivery) = delivery else {
                tracing::debug!("queue drained");
                break;
            };

            match self.handle(&delivery).await {
                Ok(true) => report.synced += 1,
                Ok(false) => report.failed += 1,
                Err(err) => {
                    tracing::info!(error = %err, "job interrupted by shutdown, leaving it unacknowledged");
                    break;
                }
            }
            queue.ack(&delivery).await?;
        }

        tracing::info!(synced = report.synced, failed = report.failed, "worker finished");
        Ok(report)
    }

    /// Decode and process one delivery. `Ok(false)` means failed and
    /// logged; `Err` is only returned for cancellation.
    async fn handle(&self, delivery: &Delivery) -> Result<bool, SyncError> {
        let job = match SyncJob::decode(&delivery.payload) {
            Ok(job) => job,
            Err(err) => {
                tracing::warn!(delivery = %delivery.id, error = %err, "dropping undecodable job");
                self.ctx.emit(SyncProgress::JobUndecodable {
                    error: err.to_string(),
                });
                return Ok(false);
            }
        };

        match self.process(&job).await {
            Ok(()) => {
                tracing::debug!(job = %job, "synced");
                self.ctx.count(job.org(), job.kind(), Counter::Done, 1).await;
                self.ctx.emit(SyncProgress::JobSynced {
                    kind: job.kind(),
                    identity: job.to_string(),
                });
                Ok(true)
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                tracing::warn!(job = %job, error = %err, "sync failed");
                self.ctx.count(job.org(), job.kind(), Counter::Failed, 1).await;
                self.ctx.emit(SyncProgress::JobFailed {
                    kind: job.kind(),
                    identity: job.to_string(),
                    error: err.to_string(),
                });
                Ok(false)
            }
        }
    }

    /// Run the syncer for one job.
    ///
    /// With nested sync enabled, issue and pull request jobs also sync
    /// their comments and reviews. A failed nested listing is logged; it
    /// does not fail the job.
    pub async fn process(&self, job: &SyncJob) -> Result<(), SyncError> {
        let ctx = self.ctx;
        match job {
            SyncJob::Organization { login } => {
                OrganizationSyncer::new(ctx).sync(login).await?;
            }
            SyncJob::User { login, .. } => {
                UserSyncer::new(ctx).sync(login).await?;
            }
            SyncJob::Repository { owner, name } => {
                RepositorySyncer::new(ctx).sync(owner, name).await?;
            }
            SyncJob::Issue { owner, repo, number } => {
                IssueSyncer::new(ctx).sync(owner, repo, *number).await?;
                if ctx.options().nested {
                    let comments = IssueCommentSyncer::new(ctx).sync_issue(owner, repo, *number).await;
                    nested_result(job, comments.into_result())?;
                }
            }
            SyncJob::PullRequest { owner, repo, number } => {
                PullRequestSyncer::new(ctx).sync(owner, repo, *number).await?;
                if ctx.options().nested {
                    let reviews = PullRequestReviewSyncer::new(ctx)
                        .sync_pull_request(owner, repo, *number)
                        .await;
                    nested_result(job, reviews.into_result())?;
                    let comments = PullRequestCommentSyncer::new(ctx)
                        .sync_pull_request(owner, repo, *number)
                        .await;
                    nested_result(job, comments.into_result())?;
                }
            }
            SyncJob::IssueComment { owner, repo, id } => {
                IssueCommentSyncer::new(ctx).sync(owner, repo, *id).await?;
            }
            SyncJob::PullRequestComment { owner, repo, id } => {
                PullRequestCommentSyncer::new(ctx).sync(owner, repo, *id).await?;
            }
            SyncJob::PullRequestReview { owner, repo, number, id } => {
                PullRequestReviewSyncer::new(ctx)
                    .sync(owner, repo, *number, *id)
                    .await?;
            }
        }
        Ok(())
    }
}

fn nested_result<T>(job: &SyncJob, result: Result<T, SyncError>) -> Result<(), SyncError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.is_cancelled() => Err(err),
        Err(err) => {
            tracing::warn!(job = %job, error = %err, "nested sync failed");
            Ok(())
        }
    }
}
