//! In-memory lock backend for single-process operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{LockBackend, LockError};

#[derive(Debug)]
struct LockEntry {
    #[allow(dead_code)]
    owner: String,
    expires_at: Instant,
}

/// Lock keys held in a process-local map with lazy expiry.
#[derive(Clone, Default)]
pub struct InMemoryLockBackend {
    entries: Arc<Mutex<HashMap<String, LockEntry>>>,
}

impl InMemoryLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` exists and has not expired.
    pub async fn is_held(&self, key: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }
}

#[async_trait]
impl LockBackend for InMemoryLockBackend {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if let Some(existing) = entries.get(key) {
            if existing.expires_at > now {
                return Ok(false);
            }
        }

        entries.insert(
            key.to_string(),
            LockEntry {
                owner: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), LockError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{lock_key, JobLock};
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_fails_until_release() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let a = JobLock::new(backend.clone(), Duration::from_secs(600), "worker-a");
        let b = a.for_owner("worker-b");

        assert!(a.try_acquire("job-1").await.unwrap());
        assert!(!b.try_acquire("job-1").await.unwrap());
        assert!(backend.is_held(&lock_key("job-1")).await);

        a.release("job-1").await;
        assert!(b.try_acquire("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_locks_are_per_job() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let lock = JobLock::new(backend, Duration::from_secs(600), "worker-a");

        assert!(lock.try_acquire("job-1").await.unwrap());
        assert!(lock.try_acquire("job-2").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_can_be_reacquired() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let crashed = JobLock::new(backend.clone(), Duration::from_secs(600), "crashed");
        let healthy = crashed.for_owner("healthy");

        assert!(crashed.try_acquire("job-1").await.unwrap());
        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(!healthy.try_acquire("job-1").await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(healthy.try_acquire("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_of_missing_key_is_noop() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let lock = JobLock::new(backend, Duration::from_secs(600), "worker-a");
        lock.release("never-acquired").await;
        assert!(lock.try_acquire("never-acquired").await.unwrap());
    }
}
