//! Redis Streams broker.
//!
//! Publish is `XADD`, consume is `XREADGROUP` within one consumer group,
//! ack is `XACK`. Entries left unacknowledged stay pending in the group.
//! Before reading new entries, `consume` claims a pending entry that has
//! been idle for at least the claim interval, so jobs held by a stopped or
//! crashed worker are handed out again.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamClaimReply, StreamId, StreamReadReply};
use tokio::sync::Mutex;

use super::{Delivery, JobQueue, QueueError};

/// How long one `consume` blocks before reporting the stream idle.
pub const DEFAULT_BLOCK: Duration = Duration::from_secs(5);

/// How long an entry must sit unacknowledged before another consumer
/// may claim it.
pub const DEFAULT_CLAIM_IDLE: Duration = Duration::from_secs(300);

/// Pending entries inspected per claim attempt.
const CLAIM_BATCH: usize = 16;

const PAYLOAD_FIELD: &str = "payload";

pub struct RedisQueue {
    stream: String,
    group: String,
    consumer: String,
    block: Duration,
    claim_idle: Duration,
    commands: MultiplexedConnection,
    /// `XREADGROUP BLOCK` holds its connection, so reads get their own.
    reader: Mutex<MultiplexedConnection>,
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue")
            .field("stream", &self.stream)
            .field("group", &self.group)
            .field("consumer", &self.consumer)
            .finish_non_exhaustive()
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Broker(err.to_string())
    }
}

impl RedisQueue {
    /// Connect to `url` and make sure the consumer group exists on `stream`.
    ///
    /// The group is named after the stream, so every worker shares it and
    /// each job goes to one of them.
    pub async fn connect(url: &str, stream: &str, consumer: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let commands = client.get_multiplexed_async_connection().await?;
        let reader = client.get_multiplexed_async_connection().await?;

        let queue = Self {
            stream: stream.to_string(),
            group: format!("{stream}:workers"),
            consumer: consumer.to_string(),
            block: DEFAULT_BLOCK,
            claim_idle: DEFAULT_CLAIM_IDLE,
            commands,
            reader: Mutex::new(reader),
        };
        queue.ensure_group().await?;
        tracing::debug!(stream = %queue.stream, group = %queue.group, "connected to redis queue");
        Ok(queue)
    }

    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    pub fn with_claim_idle(mut self, idle: Duration) -> Self {
        self.claim_idle = idle;
        self
    }

    /// Take over one pending entry idle for at least `claim_idle`.
    ///
    /// `XCLAIM` re-checks the idle time, so an entry another consumer
    /// claimed or acknowledged in between is skipped.
    async fn claim_stale(
        &self,
        conn: &mut MultiplexedConnection,
    ) -> Result<Option<Delivery>, QueueError> {
        let idle_ms = millis(self.claim_idle);
        let pending: Vec<(String, String, u64, u64)> = redis::cmd("XPENDING")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("IDLE")
            .arg(idle_ms)
            .arg("-")
            .arg("+")
            .arg(CLAIM_BATCH)
            .query_async(conn)
            .await?;

        for (id, owner, idle, deliveries) in pending {
            let claimed: StreamClaimReply = redis::cmd("XCLAIM")
                .arg(&self.stream)
                .arg(&self.group)
                .arg(&self.consumer)
                .arg(idle_ms)
                .arg(&id)
                .query_async(conn)
                .await?;
            if let Some(entry) = claimed.ids.into_iter().next() {
                tracing::info!(
                    stream = %self.stream,
                    id = %entry.id,
                    previous_consumer = %owner,
                    idle_ms = idle,
                    deliveries,
                    "claimed stale entry"
                );
                return Ok(Some(delivery_from_entry(entry)));
            }
        }
        Ok(None)
    }

    async fn ensure_group(&self) -> Result<(), QueueError> {
        let mut conn = self.commands.clone();
        let created: redis::RedisResult<String> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match created {
            Ok(_) => Ok(()),
            Err(err) if err.code() == Some("BUSYGROUP") => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn publish(&self, payload: &[u8]) -> Result<(), QueueError> {
        let mut conn = self.commands.clone();
        let _: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn consume(&self) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.reader.lock().await;
        if let Some(delivery) = self.claim_stale(&mut conn).await? {
            return Ok(Some(delivery));
        }

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(millis(self.block))
            .arg("STREAMS")
            .arg(&self.stream)
            .arg(">")
            .query_async(&mut *conn)
            .await?;

        let Some(entry) = reply
            .into_iter()
            .flat_map(|r| r.keys)
            .flat_map(|k| k.ids)
            .next()
        else {
            tracing::debug!(stream = %self.stream, "queue idle");
            return Ok(None);
        };
        Ok(Some(delivery_from_entry(entry)))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.commands.clone();
        let _: u64 = redis::cmd("XACK")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(&delivery.id)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// An entry without a payload field becomes an empty delivery, which
/// fails to decode and is acknowledged like any other bad job.
fn delivery_from_entry(entry: StreamId) -> Delivery {
    let payload = entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_else(|| {
        tracing::warn!(id = %entry.id, "stream entry has no {PAYLOAD_FIELD} field");
        Vec::new()
    });
    Delivery {
        id: entry.id,
        payload,
    }
}
