//! Queue store: one durable FIFO per job type.
//!
//! Producers push serialized job records; workers pop from the union of
//! the type queues with a bounded wait. Delivery is at-least-once, so
//! consumers pair every pop with the per-job lock in [`crate::lock`].
//!
//! Backends:
//! - In-memory (tests, single process)
//! - Redis lists (`LPUSH` / `BRPOP`, distributed)

mod error;
mod memory;
#[cfg(feature = "redis-backend")]
mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{Job, JobType};

pub use error::QueueError;
pub use memory::InMemoryQueue;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisQueue;

/// A job popped from a queue, with the queue it came from.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub queue: String,
    pub job: Job,
}

/// Shared FIFO store keyed by queue name.
///
/// Implementations must make `pop` atomic: a single entry is handed to
/// at most one caller.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append a job to the tail of `queue`.
    async fn push(&self, queue: &str, job: &Job) -> Result<(), QueueError>;

    /// Pop the oldest entry from the first non-empty queue in `queues`,
    /// waiting up to `timeout`. Returns `Ok(None)` on timeout.
    async fn pop(&self, queues: &[String], timeout: Duration)
        -> Result<Option<Delivery>, QueueError>;

    /// Number of entries waiting in `queue`.
    async fn len(&self, queue: &str) -> Result<u64, QueueError>;
}

/// Push a job onto the queue for its type.
pub async fn enqueue(store: &dyn QueueStore, job: &Job) -> Result<(), QueueError> {
    store.push(&job.job_type.queue_name(), job).await
}

/// Queue names for every dispatchable job type.
pub fn known_queues() -> Vec<String> {
    JobType::KNOWN.iter().map(JobType::queue_name).collect()
}

pub(crate) fn encode(job: &Job) -> Result<String, QueueError> {
    serde_json::to_string(job).map_err(|e| QueueError::Encode(e.to_string()))
}

pub(crate) fn decode(queue: &str, payload: &str) -> Result<Job, QueueError> {
    serde_json::from_str(payload).map_err(|e| QueueError::Decode {
        queue: queue.to_string(),
        message: e.to_string(),
    })
}
