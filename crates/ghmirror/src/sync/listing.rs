//! The two ways a listing is consumed: publish one job per item, or
//! upsert every item inline.

use std::future::Future;

use crate::entity::entity_kind::EntityKind;
use crate::github::{GitHubClient, GitHubError, Page, Paginator, Remote};
use crate::queue::{JobQueue, SyncJob};
use crate::store::{self, MirrorEntity};

use super::context::{Counter, SyncContext};
use super::error::SyncError;
use super::progress::SyncProgress;
use super::types::{InlineOutcome, InlineSync};

/// Walk a listing and publish the job `to_job` returns for each item.
///
/// Each page's count is added to the `total` counter of (`org`, `kind`)
/// once the page is published. A failed page ends the listing; jobs from
/// earlier pages stay queued.
pub(crate) async fn publish_listing<Q, T, F, Fut, M>(
    ctx: &SyncContext,
    queue: &Q,
    org: &str,
    parent: &str,
    kind: EntityKind,
    fetch: F,
    mut to_job: M,
) -> Result<u64, SyncError>
where
    Q: JobQueue + ?Sized,
    F: FnMut(GitHubClient, u32) -> Fut,
    Fut: Future<Output = Result<Page<Remote<T>>, GitHubError>>,
    M: FnMut(&Remote<T>) -> Option<SyncJob>,
{
    ctx.emit(SyncProgress::ListingStarted {
        parent: parent.to_string(),
        kind,
    });

    let mut pages = Paginator::new(ctx.pool(), fetch);
    let mut published = 0u64;
    loop {
        let (page, items) = match pages.next_page().await {
            Ok(Some(next)) => next,
            Ok(None) => break,
            Err(err) => return Err(listing_failed(ctx, parent, kind, err.into())),
        };

        let mut count = 0usize;
        for job in items.iter().filter_map(&mut to_job) {
            if let Err(err) = queue.publish_job(&job).await {
                ctx.count(org, kind, Counter::Total, count as u64).await;
                return Err(listing_failed(ctx, parent, kind, err.into()));
            }
            count += 1;
        }
        ctx.count(org, kind, Counter::Total, count as u64).await;
        published += count as u64;

        tracing::debug!(parent, %kind, page, count, "published page");
        ctx.emit(SyncProgress::PagePublished {
            parent: parent.to_string(),
            kind,
            page,
            count,
        });
    }

    tracing::info!(parent, %kind, published, pages = pages.pages_fetched(), "listing complete");
    ctx.emit(SyncProgress::ListingComplete {
        parent: parent.to_string(),
        kind,
        published,
    });
    Ok(published)
}

/// Walk a listing and upsert every item without going through a queue.
///
/// A failed upsert is logged and skipped. A failed page ends the listing;
/// the outcome still counts the items stored from earlier pages.
pub(crate) async fn upsert_listing<E, T, F, Fut, R>(
    ctx: &SyncContext,
    parent: &str,
    kind: EntityKind,
    fetch: F,
    mut to_record: R,
) -> InlineOutcome
where
    E: MirrorEntity,
    E::Model: sea_orm::IntoActiveModel<E::Active>,
    F: FnMut(GitHubClient, u32) -> Fut,
    Fut: Future<Output = Result<Page<Remote<T>>, GitHubError>>,
    R: FnMut(Remote<T>) -> E::Record,
{
    let mut pages = Paginator::new(ctx.pool(), fetch);
    let mut report = InlineSync::default();
    loop {
        let (page, items) = match pages.next_page().await {
            Ok(Some(next)) => next,
            Ok(None) => break,
            Err(err) => {
                return InlineOutcome {
                    synced: report,
                    error: Some(listing_failed(ctx, parent, kind, err.into())),
                };
            }
        };

        for item in items {
            let record = to_record(item);
            match store::upsert::<E, _>(ctx.db(), &record).await {
                Ok(_) => report.upserted += 1,
                Err(err) => {
                    tracing::warn!(
                        parent,
                        %kind,
                        page,
                        item = %E::describe(&record),
                        error = %err,
                        "failed to store item, skipping"
                    );
                    report.failed += 1;
                }
            }
        }
    }

    tracing::debug!(parent, %kind, upserted = report.upserted, failed = report.failed, "inline sync complete");
    ctx.emit(SyncProgress::InlineSynced {
        parent: parent.to_string(),
        kind,
        upserted: report.upserted,
        failed: report.failed,
    });
    InlineOutcome {
        synced: report,
        error: None,
    }
}

fn listing_failed(ctx: &SyncContext, parent: &str, kind: EntityKind, err: SyncError) -> SyncError {
    if !err.is_cancelled() {
        ctx.emit(SyncProgress::ListingFailed {
            parent: parent.to_string(),
            kind,
            error: err.to_string(),
        });
    }
    err
}
