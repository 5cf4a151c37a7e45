//! The crawl-and-sync engine.
//!
//! # Module Structure
//!
//! - [`context`] - `SyncContext`: store, credential pool, options, progress
//! - Syncers, one per entity kind: fetch through the pool, then upsert
//! - [`Producer`] - enumerates an organization and publishes jobs
//! - [`Worker`] - consumes jobs and dispatches them to syncers
//! - [`sync_stored_comments`] - comment re-sync driven by stored parents
//!
//! # Example
//!
//! ```ignore
//! use ghmirror::queue::MemoryQueue;
//! use ghmirror::sync::{Producer, SyncContext, Worker};
//!
//! let queue = MemoryQueue::new();
//! let report = Producer::new(&ctx, &queue).queue_organization("acme").await?;
//! queue.close();
//! let work = Worker::new(&ctx).run(&queue).await?;
//! ```

mod comment;
pub mod context;
mod error;
mod issue;
mod listing;
mod organization;
mod producer;
mod progress;
mod repository;
mod stored;
#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod test_support;
mod types;
mod worker;

pub use comment::{IssueCommentSyncer, PullRequestCommentSyncer, PullRequestReviewSyncer};
pub use context::{SyncContext, SyncContextBuilder, SyncContextError};
pub use error::SyncError;
pub use issue::{IssueSyncer, PullRequestSyncer};
pub use organization::{OrganizationSyncer, UserSyncer};
pub use producer::Producer;
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use repository::RepositorySyncer;
pub use stored::{StoredCommentReport, sync_stored_comments};
pub use types::{InlineOutcome, InlineSync, ProduceReport, SyncOptions, WorkReport};
pub use worker::Worker;
