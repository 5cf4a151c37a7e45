//! Everything a syncer needs, bundled.
//!
//! # Example
//!
//! ```ignore
//! use ghmirror::sync::{SyncContext, SyncOptions};
//!
//! let ctx = SyncContext::builder()
//!     .database(db)
//!     .pool(pool)
//!     .options(SyncOptions::default())
//!     .progress(callback)
//!     .build()?;
//! ```

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::entity::entity_kind::EntityKind;
use crate::github::GitHubPool;
use crate::shutdown::Shutdown;
use crate::store;

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::SyncOptions;

/// Error type for sync context construction.
#[derive(Debug, thiserror::Error)]
pub enum SyncContextError {
    /// Missing required field in builder.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Builder for creating a [`SyncContext`].
#[derive(Default)]
pub struct SyncContextBuilder {
    database: Option<Arc<DatabaseConnection>>,
    pool: Option<Arc<GitHubPool>>,
    options: Option<SyncOptions>,
    progress: Option<Arc<ProgressCallback>>,
}

impl SyncContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database(mut self, db: Arc<DatabaseConnection>) -> Self {
        self.database = Some(db);
        self
    }

    pub fn pool(mut self, pool: Arc<GitHubPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the database or the pool is missing.
    pub fn build(self) -> Result<SyncContext, SyncContextError> {
        Ok(SyncContext {
            database: self.database.ok_or(SyncContextError::MissingField { field: "database" })?,
            pool: self.pool.ok_or(SyncContextError::MissingField { field: "pool" })?,
            options: self.options.unwrap_or_default(),
            progress: self.progress,
        })
    }
}

/// Shared state for syncers, producers and workers.
#[derive(Clone)]
pub struct SyncContext {
    database: Arc<DatabaseConnection>,
    pool: Arc<GitHubPool>,
    options: SyncOptions,
    progress: Option<Arc<ProgressCallback>>,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("credentials", &self.pool.len())
            .field("options", &self.options)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    pub fn builder() -> SyncContextBuilder {
        SyncContextBuilder::new()
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.database
    }

    pub fn pool(&self) -> &GitHubPool {
        &self.pool
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn shutdown(&self) -> &Shutdown {
        self.pool.shutdown()
    }

    pub(crate) fn emit(&self, event: SyncProgress) {
        emit(self.progress.as_deref(), event);
    }

    /// Add to a status counter, logging instead of failing.
    ///
    /// Counters are advisory; a failed increment must not fail the sync
    /// that triggered it.
    pub(crate) async fn count(&self, org: &str, kind: EntityKind, counter: Counter, n: u64) {
        let result = match counter {
            Counter::Total => store::add_total(self.db(), org, kind, n).await,
            Counter::Done => store::add_done(self.db(), org, kind, n).await,
            Counter::Failed => store::add_failed(self.db(), org, kind, n).await,
        };
        if let Err(err) = result {
            tracing::warn!(org, %kind, ?counter, error = %err, "failed to update sync status");
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Total,
    Done,
    Failed,
}
