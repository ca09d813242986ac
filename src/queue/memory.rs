//! In-memory queue backend for single-process operation.
//!
//! Entries are stored serialized, the same way the Redis backend stores
//! them, so encode/decode failures surface identically.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{decode, encode, Delivery, QueueError, QueueStore};
use crate::models::Job;

/// In-memory FIFO queues keyed by name.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    queues: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    notify: Arc<Notify>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a raw payload, bypassing serialization.
    pub async fn push_raw(&self, queue: &str, payload: impl Into<String>) {
        self.queues
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.into());
        self.notify.notify_waiters();
    }

    /// Snapshot of the jobs waiting in `queue`, oldest first.
    pub async fn peek_all(&self, queue: &str) -> Vec<Job> {
        let queues = self.queues.lock().await;
        queues
            .get(queue)
            .map(|q| q.iter().filter_map(|p| decode(queue, p).ok()).collect())
            .unwrap_or_default()
    }

    async fn try_pop(&self, queues: &[String]) -> Option<(String, String)> {
        let mut guard = self.queues.lock().await;
        for name in queues {
            if let Some(payload) = guard.get_mut(name).and_then(|q| q.pop_front()) {
                return Some((name.clone(), payload));
            }
        }
        None
    }
}

#[async_trait]
impl QueueStore for InMemoryQueue {
    async fn push(&self, queue: &str, job: &Job) -> Result<(), QueueError> {
        let payload = encode(job)?;
        self.push_raw(queue, payload).await;
        Ok(())
    }

    async fn pop(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<Delivery>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register interest before checking so a push between the
            // check and the wait still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some((queue, payload)) = self.try_pop(queues).await {
                let job = decode(&queue, &payload)?;
                return Ok(Some(Delivery { queue, job }));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn len(&self, queue: &str) -> Result<u64, QueueError> {
        let queues = self.queues.lock().await;
        Ok(queues.get(queue).map(|q| q.len() as u64).unwrap_or(0))
    }
}
