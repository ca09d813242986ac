//! Retry/backoff controller.
//!
//! A failed job is re-queued onto the queue it came from after an
//! exponential delay until it has used its retries, then it is failed for
//! good. Re-delivery is fire-and-forget: a failed push is logged, not
//! retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::models::{Job, JobStatus};
use crate::queue::QueueStore;

/// Default base delay; re-delivery waits `base * 2^retry_count`.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-queue after `delay`; `attempt` is the job's new retry count.
    Retry { attempt: u32, delay: Duration },
    /// Retries exhausted; the job is now failed.
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RETRY_BASE,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// Delay before the re-delivery that follows retry number `retry_count`.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry_count.min(16)))
    }

    /// Apply a handler failure to `job` and decide what happens next.
    pub fn record_failure(&self, job: &mut Job, error_message: &str) -> RetryDecision {
        job.error_message = Some(error_message.to_string());

        if job.retry_count < job.max_retries {
            job.retry_count += 1;
            job.status = JobStatus::Pending;
            RetryDecision::Retry {
                attempt: job.retry_count,
                delay: self.backoff_delay(job.retry_count),
            }
        } else {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            RetryDecision::GiveUp
        }
    }
}

/// Push `job` back onto `queue_name` after `delay`.
pub fn schedule_redelivery(
    queue: Arc<dyn QueueStore>,
    queue_name: String,
    job: Job,
    delay: Duration,
) -> JoinHandle<()> {
    debug!(job_id = %job.id, queue = %queue_name, ?delay, "re-delivery scheduled");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match queue.push(&queue_name, &job).await {
            Ok(()) => info!(job_id = %job.id, queue = %queue_name, retry = job.retry_count, "job re-queued"),
            Err(e) => error!(job_id = %job.id, queue = %queue_name, error = %e, "failed to re-queue job"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobType;
    use crate::queue::InMemoryQueue;

    fn job() -> Job {
        Job::new("u1", JobType::SummaryGeneration, "s1", serde_json::json!({}))
    }

    #[test]
    fn test_backoff_doubles_per_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_three_retries_then_give_up() {
        let policy = RetryPolicy::default();
        let mut job = job();

        let decisions: Vec<RetryDecision> =
            (0..4).map(|_| policy.record_failure(&mut job, "boom")).collect();

        assert_eq!(
            decisions,
            vec![
                RetryDecision::Retry { attempt: 1, delay: Duration::from_secs(2) },
                RetryDecision::Retry { attempt: 2, delay: Duration::from_secs(4) },
                RetryDecision::Retry { attempt: 3, delay: Duration::from_secs(8) },
                RetryDecision::GiveUp,
            ]
        );
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.retry_count, 3);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_retry_resets_status_to_pending() {
        let mut job = job();
        job.mark_processing();
        RetryPolicy::default().record_failure(&mut job, "timeout");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redelivery_lands_after_delay() {
        let queue = InMemoryQueue::new();
        let name = JobType::SummaryGeneration.queue_name();

        schedule_redelivery(
            Arc::new(queue.clone()),
            name.clone(),
            job(),
            Duration::from_secs(2),
        );

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(queue.len(&name).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(queue.len(&name).await.unwrap(), 1);
    }
}
