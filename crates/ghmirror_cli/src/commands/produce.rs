use std::error::Error;

use ghmirror::queue::JobQueue;
use ghmirror::sync::{ProduceReport, Producer, SyncContext};

/// Publish jobs for each organization in turn.
pub(crate) async fn handle_produce(
    ctx: &SyncContext,
    queue: &dyn JobQueue,
    orgs: &[String],
) -> Result<(), Box<dyn Error>> {
    let producer = Producer::new(ctx, queue);
    for org in orgs {
        let report = producer.queue_organization(org).await?;
        print_report(org, &report);
    }
    Ok(())
}

pub(crate) fn print_report(org: &str, report: &ProduceReport) {
    println!("Queued {} jobs for {org}:", report.total_published());
    for (kind, count) in &report.published {
        println!("  {kind:<22} {count}");
    }
    if !report.failed_parents.is_empty() {
        println!("Listings that failed ({}):", report.failed_parents.len());
        for (parent, error) in &report.failed_parents {
            println!("  {parent}: {error}");
        }
    }
}
