//! Work distribution between producers and workers.
//!
//! The broker only moves opaque byte payloads; [`SyncJob`] defines what is
//! inside them. A delivery must be acknowledged once processed, whether
//! the sync succeeded or not.

mod job;
mod memory;
#[cfg(feature = "redis")]
mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use job::{CURRENT_VERSION, JobDecodeError, SyncJob};
pub use memory::MemoryQueue;
#[cfg(feature = "redis")]
pub use redis::{DEFAULT_BLOCK, DEFAULT_CLAIM_IDLE, RedisQueue};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("broker error: {0}")]
    Broker(String),

    #[error("failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A payload handed to a consumer, pending acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned message id.
    pub id: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn publish(&self, payload: &[u8]) -> Result<(), QueueError>;

    /// Wait for the next payload. `None` means there is nothing more to
    /// consume: the queue was closed and drained, or the broker stayed idle.
    async fn consume(&self) -> Result<Option<Delivery>, QueueError>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Encode and publish one job.
    async fn publish_job(&self, job: &SyncJob) -> Result<(), QueueError> {
        let payload = job.encode()?;
        self.publish(&payload).await
    }
}

#[async_trait]
impl<Q: JobQueue + ?Sized> JobQueue for std::sync::Arc<Q> {
    async fn publish(&self, payload: &[u8]) -> Result<(), QueueError> {
        (**self).publish(payload).await
    }

    async fn consume(&self) -> Result<Option<Delivery>, QueueError> {
        (**self).consume().await
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        (**self).ack(delivery).await
    }
}
