use std::error::Error;

use ghmirror::sync::{SyncContext, sync_stored_comments};

pub(crate) async fn handle_comments(ctx: &SyncContext, org: &str) -> Result<(), Box<dyn Error>> {
    let report = sync_stored_comments(ctx, org).await?;
    println!(
        "Synced {} comments across {} threads in {} repositories ({} comments failed, {} threads failed).",
        report.comments.upserted,
        report.threads,
        report.repositories,
        report.comments.failed,
        report.failed_threads,
    );
    Ok(())
}
