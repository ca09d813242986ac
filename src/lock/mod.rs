//! Per-job distributed lock.
//!
//! A lock entry is a key `job_lock:<job_id>` created only if absent, with
//! a time-to-live. Existence means some worker owns the job; the TTL
//! bounds how long a crashed worker can hold it.

mod memory;
#[cfg(feature = "redis-backend")]
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub use memory::InMemoryLockBackend;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisLockBackend;

/// Default lock time-to-live (10 minutes).
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "redis-backend")]
impl From<::redis::RedisError> for LockError {
    fn from(e: ::redis::RedisError) -> Self {
        LockError::Backend(e.to_string())
    }
}

/// Storage for lock keys. Must provide atomic create-if-absent.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Create `key` with `value` and `ttl` only if it does not exist.
    /// Returns true iff the key was created.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, LockError>;

    /// Delete `key` whether or not it exists.
    async fn delete(&self, key: &str) -> Result<(), LockError>;
}

/// Lock key for a job.
pub fn lock_key(job_id: &str) -> String {
    format!("job_lock:{}", job_id)
}

/// Job lock bound to one worker identity.
#[derive(Clone)]
pub struct JobLock {
    backend: Arc<dyn LockBackend>,
    ttl: Duration,
    owner: String,
}

impl JobLock {
    pub fn new(backend: Arc<dyn LockBackend>, ttl: Duration, owner: impl Into<String>) -> Self {
        Self {
            backend,
            ttl,
            owner: owner.into(),
        }
    }

    /// Same backend and TTL, different owner (one per worker).
    pub fn for_owner(&self, owner: impl Into<String>) -> Self {
        Self {
            backend: self.backend.clone(),
            ttl: self.ttl,
            owner: owner.into(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Try to become the exclusive owner of `job_id`. Never waits.
    pub async fn try_acquire(&self, job_id: &str) -> Result<bool, LockError> {
        let acquired = self
            .backend
            .set_if_absent(&lock_key(job_id), &self.owner, self.ttl)
            .await?;
        debug!(job_id, owner = %self.owner, acquired, "lock attempt");
        Ok(acquired)
    }

    /// Unconditionally delete the lock for `job_id`.
    ///
    /// Failures are logged; the TTL reclaims the key eventually.
    pub async fn release(&self, job_id: &str) {
        if let Err(e) = self.backend.delete(&lock_key(job_id)).await {
            warn!(job_id, error = %e, "Failed to release job lock, waiting for TTL");
        }
    }
}
