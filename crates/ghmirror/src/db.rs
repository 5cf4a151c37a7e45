//! Database connection utilities.

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Pragmas applied to file-backed SQLite databases.
///
/// - `journal_mode=WAL` lets consumers read while another process writes
/// - `busy_timeout=5000` waits for locks instead of failing immediately
/// - `synchronous=NORMAL` is safe with WAL
const SQLITE_PRAGMAS: &[&str] = &[
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

fn is_file_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite:") && !database_url.contains(":memory:")
}

/// Establish a connection to the database.
///
/// File-backed SQLite databases get WAL mode, a 5 second busy timeout and
/// `synchronous=NORMAL`.
///
/// # Arguments
/// * `database_url` - e.g. `sqlite://ghmirror.db?mode=rwc` or `postgres:///ghmirror`
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    if is_file_sqlite(database_url) {
        configure_sqlite(&db).await?;
    }

    tracing::debug!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}

/// Establish a connection and run all pending migrations.
///
/// Used by tests and by `migrate up`; the sync commands use [`connect`] plus
/// the schema gate instead.
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
