use std::error::Error;

use ghmirror::queue::MemoryQueue;
use ghmirror::sync::{Producer, SyncContext, Worker};

use super::produce::print_report;

/// Produce and consume one organization in process, without a broker.
///
/// The worker drains the in-memory queue while the producer fills it; the
/// queue is closed once producing ends, successfully or not.
pub(crate) async fn handle_deep(ctx: &SyncContext, org: &str) -> Result<(), Box<dyn Error>> {
    let queue = MemoryQueue::new();

    let produce = async {
        let result = Producer::new(ctx, &queue).queue_organization(org).await;
        queue.close();
        result
    };
    let worker = Worker::new(ctx);
    let work = worker.run(&queue);

    let (produced, worked) = tokio::join!(produce, work);
    let report = produced?;
    let work = worked?;

    print_report(org, &report);
    println!("Synced {} jobs, {} failed.", work.synced, work.failed);
    if !queue.is_empty() {
        println!("{} jobs left unprocessed.", queue.len());
    }
    Ok(())
}
