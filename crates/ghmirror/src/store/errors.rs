use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur while reading or writing mirrored records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// An insert lost a race to a concurrent writer, but the winning row
    /// could not be found afterwards.
    #[error("{table} row for {identity} conflicted on insert but was not found on re-read")]
    ConflictVanished { table: String, identity: String },
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
