//! Startup gate comparing the store's schema with the compiled migrations.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use thiserror::Error;

use crate::migration::{MIGRATION_TABLE, Migrator};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("database has no migrations applied (requires {required}). Run `ghmirror migrate up`")]
    NotMigrated { required: String },

    #[error(
        "database schema version mismatch: found {current}, requires {required}. Run `ghmirror migrate up`"
    )]
    VersionMismatch { current: String, required: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Name of the newest migration compiled into this binary.
pub fn required_version() -> String {
    Migrator::migrations()
        .last()
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

/// Name of the newest migration applied to `db`, if any.
pub async fn current_version(db: &DatabaseConnection) -> Result<Option<String>, DbErr> {
    let manager = SchemaManager::new(db);
    if !manager.has_table(MIGRATION_TABLE).await? {
        return Ok(None);
    }

    let version = Alias::new("version");
    let stmt = Query::select()
        .column(version.clone())
        .from(Alias::new(MIGRATION_TABLE))
        .order_by(version, Order::Desc)
        .limit(1)
        .to_owned();

    let row = db.query_one(db.get_database_backend().build(&stmt)).await?;
    row.map(|r| r.try_get::<String>("", "version")).transpose()
}

/// Fail unless the latest applied migration equals the latest compiled one.
pub async fn ensure_current(db: &DatabaseConnection) -> Result<(), SchemaError> {
    let required = required_version();
    match current_version(db).await? {
        None => Err(SchemaError::NotMigrated { required }),
        Some(current) if current != required => {
            Err(SchemaError::VersionMismatch { current, required })
        }
        Some(current) => {
            tracing::debug!(version = %current, "database schema is current");
            Ok(())
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::{connect, connect_and_migrate};

    #[test]
    fn required_version_is_the_last_migration() {
        assert_eq!(required_version(), "m20250601_000002_create_sync_status");
    }

    #[tokio::test]
    async fn migrated_database_passes() {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        ensure_current(&db).await.expect("schema current");
        assert_eq!(current_version(&db).await.expect("version"), Some(required_version()));
    }

    #[tokio::test]
    async fn empty_database_is_not_migrated() {
        let db = connect("sqlite::memory:").await.expect("db");
        let err = ensure_current(&db).await.expect_err("no migrations");
        assert!(matches!(err, SchemaError::NotMigrated { .. }));
        assert!(err.to_string().contains("migrate up"));
    }

    #[tokio::test]
    async fn older_schema_is_a_mismatch() {
        let db = connect("sqlite::memory:").await.expect("db");
        Migrator::up(&db, Some(1)).await.expect("first migration only");

        let err = ensure_current(&db).await.expect_err("behind");
        match err {
            SchemaError::VersionMismatch { current, required } => {
                assert_eq!(current, "m20250601_000001_create_mirror_schema");
                assert_eq!(required, required_version());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
