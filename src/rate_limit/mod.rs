//! Rate slots for the external generative model.
//!
//! A fixed pool of interchangeable permits shared by every worker. Each
//! model call holds one slot for its whole external-call duration; the
//! slot returns to the pool when the guard drops, on every exit path.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Default number of concurrent model calls.
pub const DEFAULT_MODEL_CONCURRENCY: usize = 5;
/// Default upper bound on waiting for a free slot.
pub const DEFAULT_SLOT_WAIT: Duration = Duration::from_secs(300);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("Timed out after {0:?} waiting for a model slot")]
    Timeout(Duration),
    #[error("Rate slot pool is closed")]
    Closed,
}

/// Bounded counting semaphore over model-call permissions.
#[derive(Clone)]
pub struct RateSlots {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    wait: Duration,
}

impl RateSlots {
    pub fn new(capacity: usize) -> Self {
        Self::with_wait(capacity, DEFAULT_SLOT_WAIT)
    }

    pub fn with_wait(capacity: usize, wait: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            wait,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held by in-flight calls.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Wait for a free slot, giving up after the configured wait.
    pub async fn acquire(&self) -> Result<RateSlot, SlotError> {
        let permit = tokio::time::timeout(self.wait, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| SlotError::Timeout(self.wait))?
            .map_err(|_| SlotError::Closed)?;

        debug!(in_flight = self.in_flight(), capacity = self.capacity, "model slot acquired");
        Ok(RateSlot { _permit: permit })
    }
}

impl Default for RateSlots {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_CONCURRENCY)
    }
}

/// One held slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct RateSlot {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_in_flight_never_exceeds_capacity() {
        let slots = RateSlots::new(2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let slots = slots.clone();
            let current = current.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _slot = slots.acquire().await.unwrap();
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(slots.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_third_waiter_admitted_only_after_release() {
        let slots = RateSlots::new(2);
        let a = slots.acquire().await.unwrap();
        let _b = slots.acquire().await.unwrap();

        let waiter = {
            let slots = slots.clone();
            tokio::spawn(async move { slots.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(a);
        let third = waiter.await.unwrap();
        assert!(third.is_ok());
        assert_eq!(slots.in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_times_out() {
        let slots = RateSlots::with_wait(1, Duration::from_secs(300));
        let _held = slots.acquire().await.unwrap();

        let err = slots.acquire().await.unwrap_err();
        assert_eq!(err, SlotError::Timeout(Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(RateSlots::new(0).capacity(), 1);
    }
}
