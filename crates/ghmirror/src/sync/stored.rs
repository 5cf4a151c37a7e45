//! Re-sync comments for entities already in the store.

use crate::store;

use super::comment::IssueCommentSyncer;
use super::context::SyncContext;
use super::error::SyncError;
use super::types::InlineSync;

/// Result of [`sync_stored_comments`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoredCommentReport {
    pub repositories: u64,
    /// Issues and pull requests whose comments were listed.
    pub threads: u64,
    /// Threads whose listing failed part way.
    pub failed_threads: u64,
    pub comments: InlineSync,
}

/// List and upsert the issue comments of every stored issue and pull
/// request in every stored, non-excluded repository of `owner`.
///
/// Reads parents from the store instead of the API. A failed page ends
/// that thread's listing; the next thread continues.
pub async fn sync_stored_comments(
    ctx: &SyncContext,
    owner: &str,
) -> Result<StoredCommentReport, SyncError> {
    let repos = store::stored_repositories(ctx.db(), owner, &ctx.options().excluded_repos).await?;
    let syncer = IssueCommentSyncer::new(ctx);
    let mut report = StoredCommentReport::default();

    for repo in &repos {
        let mut numbers = store::issue_numbers(ctx.db(), owner, &repo.name).await?;
        numbers.extend(store::pull_request_numbers(ctx.db(), owner, &repo.name).await?);
        numbers.sort_unstable();
        numbers.dedup();

        tracing::info!(owner, repo = %repo.name, threads = numbers.len(), "syncing stored comments");
        for number in numbers {
            ctx.shutdown().check()?;
            report.threads += 1;
            let outcome = syncer.sync_issue(owner, &repo.name, number).await;
            report.comments += outcome.synced;
            match outcome.error {
                None => {}
                Some(err) if err.is_cancelled() => return Err(err),
                Some(err) => {
                    tracing::warn!(
                        owner,
                        repo = %repo.name,
                        number,
                        error = %err,
                        "comment listing failed, skipping"
                    );
                    report.failed_threads += 1;
                }
            }
        }
        report.repositories += 1;
    }

    tracing::info!(
        owner,
        repositories = report.repositories,
        threads = report.threads,
        comments = report.comments.upserted,
        "stored comments synced"
    );
    Ok(report)
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::entity::{issue, issue_comment, pull_request, repository};
    use crate::github::Remote;
    use crate::http::MockTransport;
    use crate::store::RepoScoped;
    use crate::sync::SyncOptions;
    use crate::sync::test_support::{context, page_url, push_page};

    #[tokio::test]
    async fn lists_comments_for_stored_threads_and_skips_failures() {
        let mock = MockTransport::new();
        let options = SyncOptions {
            excluded_repos: vec!["skip".to_string()],
            ..SyncOptions::default()
        };
        let ctx = context(&mock, options).await;
        let db = ctx.db();

        for (id, name) in [(1, "a"), (2, "skip")] {
            let payload = json!({"id": id, "name": name, "owner": {"id": 1, "login": "acme"}});
            let repo = Remote::from_value(payload).expect("repo");
            store::upsert::<repository::Entity, _>(db, &repo).await.expect("repo");
        }
        let issue = Remote::from_value(json!({"id": 10, "number": 1})).expect("issue");
        store::upsert::<issue::Entity, _>(db, &RepoScoped::new("acme", "a", issue))
            .await
            .expect("issue");
        let pull = Remote::from_value(json!({"id": 20, "number": 2})).expect("pull");
        store::upsert::<pull_request::Entity, _>(db, &RepoScoped::new("acme", "a", pull))
            .await
            .expect("pull");

        push_page(
            &mock,
            "/repos/acme/a/issues/1/comments",
            1,
            json!([{"id": 100}, {"id": 101}]),
            Some(2),
        );
        mock.push_json(
            page_url("/repos/acme/a/issues/1/comments", 2),
            502,
            json!({"message": "Bad Gateway"}),
        );
        push_page(&mock, "/repos/acme/a/issues/2/comments", 1, json!([{"id": 200}]), None);

        let report = sync_stored_comments(&ctx, "acme").await.expect("sync");

        assert_eq!(report.repositories, 1);
        assert_eq!(report.threads, 2);
        assert_eq!(report.failed_threads, 1);
        // Page one of the failed thread is stored and counted.
        assert_eq!(report.comments.upserted, 3);
        assert_eq!(store::count::<issue_comment::Entity, _>(db).await.expect("count"), 3);
        assert!(!mock.requests().iter().any(|r| r.url.contains("/repos/acme/skip/")));
    }
}
