use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{Delivery, JobQueue, QueueError};

/// In-process FIFO queue for running producer and worker together.
///
/// Consumers wait while the queue is empty and open. After [`close`]
/// they drain what is left and then get `None`.
///
/// [`close`]: MemoryQueue::close
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<MemoryState>,
    notify: Notify,
    next_id: AtomicU64,
}

#[derive(Debug, Default)]
struct MemoryState {
    items: VecDeque<Delivery>,
    closed: bool,
    unacked: usize,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop accepting jobs and wake every waiting consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Jobs published but not yet consumed.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs consumed but not yet acknowledged.
    pub fn unacked(&self) -> usize {
        self.lock().unacked
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn publish(&self, payload: &[u8]) -> Result<(), QueueError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = self.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.items.push_back(Delivery {
                id: id.to_string(),
                payload: payload.to_vec(),
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn consume(&self) -> Result<Option<Delivery>, QueueError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if let Some(delivery) = state.items.pop_front() {
                    state.unacked += 1;
                    return Ok(Some(delivery));
                }
                if state.closed {
                    return Ok(None);
                }
            }
            notified.await;
        }
    }

    async fn ack(&self, _delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.lock();
        state.unacked = state.unacked.saturating_sub(1);
        Ok(())
    }
}
