use std::error::Error;

use ghmirror::queue::JobQueue;
use ghmirror::sync::{SyncContext, Worker, WorkReport};

/// Consume jobs until the broker goes idle, or until shutdown with `follow`.
pub(crate) async fn handle_work(
    ctx: &SyncContext,
    queue: &dyn JobQueue,
    follow: bool,
) -> Result<(), Box<dyn Error>> {
    let worker = Worker::new(ctx);
    let mut total = WorkReport::default();

    loop {
        let report = worker.run(queue).await?;
        total.synced += report.synced;
        total.failed += report.failed;

        if !follow || ctx.shutdown().is_requested() {
            break;
        }
        tracing::debug!("queue idle, waiting for more jobs");
    }

    println!("Synced {} jobs, {} failed.", total.synced, total.failed);
    Ok(())
}
