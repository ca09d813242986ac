//! Success and failure bookkeeping for a handled job.
//!
//! Each handled job ends in exactly one of: completed (one `completed`
//! event), re-queued (no event), or failed (one `error` event).

use std::sync::Arc;

use tracing::{error, info, warn};

use super::error::JobError;
use super::handlers::JobOutcome;
use crate::models::{ContentStatus, Job, JobType, StatusEvent};
use crate::queue::QueueStore;
use crate::repository::{PipelineRepository, RepositoryError};
use crate::retry::{schedule_redelivery, RetryDecision, RetryPolicy};
use crate::status::StatusPublisher;

/// Cancel a job. A worker already running it is not interrupted.
pub async fn cancel_job(
    repo: &dyn PipelineRepository,
    job_id: &str,
) -> Result<Job, RepositoryError> {
    let mut job = repo
        .get_job(job_id)
        .await?
        .ok_or_else(|| RepositoryError::not_found("job", job_id))?;
    if job.status.is_terminal() {
        return Ok(job);
    }
    job.cancel();
    repo.update_job(&job).await?;
    info!(job_id, "Job cancelled");
    Ok(job)
}

pub(crate) struct Bookkeeper {
    pub queue: Arc<dyn QueueStore>,
    pub repo: Arc<dyn PipelineRepository>,
    pub publisher: StatusPublisher,
    pub retry: RetryPolicy,
}

impl Bookkeeper {
    pub async fn succeeded(&self, mut job: Job, outcome: JobOutcome) {
        job.mark_completed();
        if let Err(e) = self.repo.update_job(&job).await {
            error!(job_id = %job.id, error = %e, "Failed to persist job completion");
        }
        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            result_id = %outcome.result_id,
            result_type = outcome.result_type,
            "Job completed"
        );
        self.publisher
            .publish(
                &job.user_id,
                StatusEvent::completed(&job.id, outcome.result_id, outcome.result_type),
            )
            .await;
    }

    /// Apply the retry policy; `queue` is where re-deliveries go.
    pub async fn failed(&self, mut job: Job, queue: &str, err: JobError) {
        let message = err.to_string();
        match self.retry.record_failure(&mut job, &message) {
            RetryDecision::Retry { attempt, delay } => {
                warn!(
                    job_id = %job.id,
                    kind = err.kind(),
                    attempt,
                    max_retries = job.max_retries,
                    ?delay,
                    error = %message,
                    "Job failed, retrying"
                );
                if let Err(e) = self.repo.update_job(&job).await {
                    error!(job_id = %job.id, error = %e, "Failed to persist retry state");
                }
                schedule_redelivery(self.queue.clone(), queue.to_string(), job, delay);
            }
            RetryDecision::GiveUp => {
                error!(
                    job_id = %job.id,
                    kind = err.kind(),
                    retries = job.retry_count,
                    error = %message,
                    "Job failed permanently"
                );
                if let Err(e) = self.repo.update_job(&job).await {
                    error!(job_id = %job.id, error = %e, "Failed to persist job failure");
                }
                if job.job_type == JobType::ContentProcessing {
                    if let Err(e) = self
                        .repo
                        .update_content_status(&job.reference_id, ContentStatus::Failed)
                        .await
                    {
                        warn!(
                            job_id = %job.id,
                            content_id = %job.reference_id,
                            error = %e,
                            "Failed to mark content failed"
                        );
                    }
                }
                self.publisher
                    .publish(&job.user_id, StatusEvent::failed(&job.id, message))
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, JobStatus};
    use crate::queue::InMemoryQueue;
    use crate::repository::InMemoryRepository;
    use crate::status::BroadcastSink;

    fn bookkeeper(
        queue: &InMemoryQueue,
        repo: &InMemoryRepository,
        sink: &BroadcastSink,
    ) -> Bookkeeper {
        Bookkeeper {
            queue: Arc::new(queue.clone()),
            repo: Arc::new(repo.clone()),
            publisher: StatusPublisher::new(Arc::new(sink.clone())),
            retry: RetryPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_terminal_content_failure_marks_content_failed() {
        let queue = InMemoryQueue::new();
        let repo = InMemoryRepository::new();
        let sink = BroadcastSink::new(16);
        let mut events = sink.subscribe();

        let item = ContentItem::file("c1", "u1", "Notes", "/tmp/notes.bin");
        repo.save_content(&item).await.unwrap();
        let mut job = Job::new("u1", JobType::ContentProcessing, "c1", serde_json::json!({}));
        job.retry_count = job.max_retries;
        repo.save_job(&job).await.unwrap();

        bookkeeper(&queue, &repo, &sink)
            .failed(job.clone(), &JobType::ContentProcessing.queue_name(), JobError::Permanent("boom".into()))
            .await;

        let stored = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        let content = repo.get_content("c1").await.unwrap().unwrap();
        assert_eq!(content.status, ContentStatus::Failed);

        let msg = events.recv().await.unwrap();
        assert_eq!(msg.channel, "user:u1:jobs");
        let event: StatusEvent = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(event, StatusEvent::failed(&job.id, "boom"));
    }

    #[tokio::test]
    async fn test_cancel_only_flips_pending_jobs() {
        let repo = InMemoryRepository::new();
        let mut job = Job::new("u1", JobType::QuizGeneration, "q1", serde_json::json!({}));
        repo.save_job(&job).await.unwrap();

        let cancelled = cancel_job(&repo, &job.id).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Failed);
        assert_eq!(cancelled.error_message.as_deref(), Some("cancelled"));

        job.mark_completed();
        repo.save_job(&job).await.unwrap();
        let untouched = cancel_job(&repo, &job.id).await.unwrap();
        assert_eq!(untouched.status, JobStatus::Completed);

        assert!(matches!(
            cancel_job(&repo, "missing").await,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
