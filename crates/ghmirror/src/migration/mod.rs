//! Database migrations for the mirror schema.
//!
//! This module is only available when the `migrate` feature is enabled.

pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_mirror_schema;
mod m20250601_000002_create_sync_status;

/// Name of the table sea-orm-migration records applied migrations in.
pub const MIGRATION_TABLE: &str = "ghmirror_migrations";

/// The migrator that runs all migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_mirror_schema::Migration),
            Box::new(m20250601_000002_create_sync_status::Migration),
        ]
    }

    fn migration_table_name() -> SeaRc<dyn Iden> {
        SeaRc::new(Alias::new(MIGRATION_TABLE))
    }
}
