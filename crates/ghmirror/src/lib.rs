//! ghmirror - mirror a GitHub organization's metadata into a relational store.
//!
//! Producers enumerate an organization through a pool of credentials and
//! publish one job per entity; workers consume those jobs, fetch each
//! entity and upsert it. Everything is keyed by natural identity, so
//! re-running any part converges on the same rows.
//!
//! # Features
//!
//! - `migrate` - Enables database migration support and the schema gate
//!   ([`schema::ensure_current`]).
//! - `sqlite` / `postgres` - Database backends.
//! - `redis` - The Redis Streams job queue.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ghmirror::{connect_and_migrate, github, queue::MemoryQueue, sync, transport};
//!
//! let db = connect_and_migrate("sqlite://ghmirror.db?mode=rwc").await?;
//! let http = transport::build_transport(&transport::TransportOptions::default())?;
//! let pool = github::pool_from_tokens(&tokens, http, &github::ClientOptions::default())?;
//!
//! let ctx = sync::SyncContext::builder()
//!     .database(Arc::new(db))
//!     .pool(Arc::new(pool))
//!     .build()?;
//! let queue = MemoryQueue::new();
//! sync::Producer::new(&ctx, &queue).queue_organization("acme").await?;
//! ```

pub mod cache;
pub mod db;
pub mod entity;
pub mod github;
pub mod http;
pub mod queue;
pub mod retry;
pub mod shutdown;
pub mod store;
pub mod sync;
pub mod transport;

#[cfg(feature = "migrate")]
pub mod migration;

#[cfg(feature = "migrate")]
pub mod schema;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use shutdown::{Cancelled, Shutdown};
