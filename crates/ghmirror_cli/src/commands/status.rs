use std::error::Error;

use ghmirror::store;
use sea_orm::DatabaseConnection;

pub(crate) async fn handle_status(db: &DatabaseConnection, org: &str) -> Result<(), Box<dyn Error>> {
    let rows = store::status_for_org(db, org).await?;
    if rows.is_empty() {
        println!("No sync status recorded for {org}.");
        return Ok(());
    }

    println!(
        "{:<22} {:>8} {:>8} {:>8} {:>8}  updated",
        "entity", "total", "done", "failed", "pending"
    );
    for row in &rows {
        println!(
            "{:<22} {:>8} {:>8} {:>8} {:>8}  {}",
            row.entity.to_string(),
            row.total,
            row.done,
            row.failed,
            row.pending(),
            row.updated_at.to_rfc3339(),
        );
    }
    Ok(())
}
