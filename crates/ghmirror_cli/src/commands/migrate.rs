use ghmirror::db;
use ghmirror::migration::{Migrator, MigratorTrait};
use ghmirror::schema;

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            println!("Applying migrations...");
            Migrator::up(&db, None).await?;
            println!(
                "Migrations applied successfully (schema {}).",
                schema::required_version()
            );
        }
        MigrateAction::Down => {
            println!("Rolling back last migration...");
            Migrator::down(&db, Some(1)).await?;
            println!("Rollback complete.");
        }
        MigrateAction::Status => {
            println!("Migration status:");
            Migrator::status(&db).await?;
            match schema::current_version(&db).await? {
                Some(current) => println!("Current schema: {current}"),
                None => println!("Current schema: none"),
            }
            println!("Required schema: {}", schema::required_version());
        }
        MigrateAction::Fresh => {
            println!("Dropping all tables and reapplying migrations...");
            Migrator::fresh(&db).await?;
            println!("Fresh migration complete.");
        }
    }

    Ok(())
}
