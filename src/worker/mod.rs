//! Worker pool.
//!
//! A fixed number of long-lived tasks each run the same loop: pop from the
//! type queues with a bounded wait, take the per-job lock, dispatch to the
//! handler, record the outcome, release the lock.

mod error;
mod handlers;
mod lifecycle;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::lock::JobLock;
use crate::models::{Job, StatusEvent};
use crate::queue::{known_queues, Delivery, QueueError, QueueStore};
use crate::repository::PipelineRepository;
use crate::retry::{schedule_redelivery, RetryPolicy};
use crate::status::StatusPublisher;

pub use error::{JobError, SubmitError};
pub use handlers::{initial_estimate, JobHandler, JobOutcome, PipelineHandlers, STEP_ANALYZING};
pub use lifecycle::cancel_job;

use lifecycle::Bookkeeper;

/// Default number of workers.
pub const DEFAULT_WORKER_COUNT: usize = 5;
/// Default bounded wait on a queue pop.
pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a queue backend error before polling again.
const BACKEND_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Collaborators shared by every worker.
pub struct WorkerDeps {
    pub queue: Arc<dyn QueueStore>,
    pub lock: JobLock,
    pub repo: Arc<dyn PipelineRepository>,
    pub handler: Arc<dyn JobHandler>,
    pub publisher: StatusPublisher,
}

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub pop_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            pop_timeout: DEFAULT_POP_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

struct Shared {
    queue: Arc<dyn QueueStore>,
    lock: JobLock,
    repo: Arc<dyn PipelineRepository>,
    handler: Arc<dyn JobHandler>,
    publisher: StatusPublisher,
    bookkeeper: Bookkeeper,
    pop_timeout: Duration,
    queues: Vec<String>,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    id_prefix: String,
}

impl WorkerPool {
    pub fn new(deps: WorkerDeps, options: PoolOptions) -> Self {
        let bookkeeper = Bookkeeper {
            queue: deps.queue.clone(),
            repo: deps.repo.clone(),
            publisher: deps.publisher.clone(),
            retry: options.retry,
        };
        let (shutdown, _) = watch::channel(false);
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "worker".to_string());

        Self {
            shared: Arc::new(Shared {
                queue: deps.queue,
                lock: deps.lock,
                repo: deps.repo,
                handler: deps.handler,
                publisher: deps.publisher,
                bookkeeper,
                pop_timeout: options.pop_timeout,
                queues: known_queues(),
            }),
            shutdown,
            handles: Vec::new(),
            id_prefix: format!("{}-{}", host, std::process::id()),
        }
    }

    /// Launch `worker_count` loops.
    pub fn start(&mut self, worker_count: usize) {
        // Clear a previous stop signal so a restarted pool runs again.
        self.shutdown.send_replace(false);
        let base = self.handles.len();
        for n in base..base + worker_count {
            let id = format!("{}-{}", self.id_prefix, n);
            let worker = Worker {
                lock: self.shared.lock.for_owner(id.clone()),
                id,
                shared: self.shared.clone(),
            };
            let shutdown = self.shutdown.subscribe();
            self.handles.push(tokio::spawn(worker.run(shutdown)));
        }
        info!(workers = worker_count, "Worker pool started");
    }

    /// Number of running worker loops.
    pub fn worker_count(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Signal every loop to exit after its current iteration and wait for
    /// them. In-flight handlers run to completion.
    pub async fn stop(&mut self) {
        self.shutdown.send_replace(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}

struct Worker {
    id: String,
    lock: JobLock,
    shared: Arc<Shared>,
}

impl Worker {
    async fn run(self, shutdown: watch::Receiver<bool>) {
        debug!(worker = %self.id, "worker loop started");
        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            let popped = self
                .shared
                .queue
                .pop(&self.shared.queues, self.shared.pop_timeout)
                .await;

            match popped {
                Ok(Some(delivery)) => self.process(delivery).await,
                Ok(None) => continue,
                Err(QueueError::Decode { queue, message }) => {
                    warn!(worker = %self.id, %queue, error = %message, "Dropping malformed queue entry");
                }
                Err(e) => {
                    error!(worker = %self.id, error = %e, "Queue pop failed");
                    tokio::time::sleep(BACKEND_ERROR_PAUSE).await;
                }
            }
        }
        debug!(worker = %self.id, "worker loop exited");
    }

    async fn process(&self, delivery: Delivery) {
        let job_id = delivery.job.id.clone();

        match self.lock.try_acquire(&job_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(worker = %self.id, %job_id, "Job owned by another worker, skipping");
                return;
            }
            Err(e) => {
                // Put the entry back rather than lose it.
                warn!(worker = %self.id, %job_id, error = %e, "Lock backend failed, re-queueing");
                schedule_redelivery(
                    self.shared.queue.clone(),
                    delivery.queue,
                    delivery.job,
                    BACKEND_ERROR_PAUSE,
                );
                return;
            }
        }

        let result = AssertUnwindSafe(self.run_locked(delivery)).catch_unwind().await;
        self.lock.release(&job_id).await;
        if let Err(panic) = result {
            error!(
                worker = %self.id,
                %job_id,
                panic = %panic_message(&*panic),
                "Job bookkeeping panicked"
            );
        }
    }

    async fn run_locked(&self, delivery: Delivery) {
        let Delivery { queue, job: delivered } = delivery;

        // The stored record is authoritative; it reflects cancellation and
        // the latest retry count.
        let mut job = match self.shared.repo.get_job(&delivered.id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => delivered,
            Err(e) => {
                warn!(worker = %self.id, job_id = %delivered.id, error = %e, "Job lookup failed, using queued record");
                delivered
            }
        };
        if job.status.is_terminal() {
            debug!(worker = %self.id, job_id = %job.id, status = job.status.as_str(), "Skipping finished job");
            return;
        }

        job.mark_processing();
        if let Err(e) = self.shared.repo.save_job(&job).await {
            warn!(worker = %self.id, job_id = %job.id, error = %e, "Failed to persist processing status");
        }
        info!(worker = %self.id, job_id = %job.id, job_type = %job.job_type, attempt = job.retry_count, "Processing job");
        self.shared
            .publisher
            .publish(
                &job.user_id,
                StatusEvent::progress(&job.id, 1, STEP_ANALYZING, initial_estimate(&job.job_type)),
            )
            .await;

        let outcome = match AssertUnwindSafe(self.shared.handler.handle(&job))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(JobError::Permanent(format!(
                "handler panicked: {}",
                panic_message(&*panic)
            ))),
        };

        match outcome {
            Ok(outcome) => self.shared.bookkeeper.succeeded(job, outcome).await,
            Err(err) => self.shared.bookkeeper.failed(job, &queue, err).await,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Save a pending job and push it onto its type queue.
pub async fn submit_job(
    repo: &dyn PipelineRepository,
    queue: &dyn QueueStore,
    job: &Job,
) -> Result<(), SubmitError> {
    repo.save_job(job).await?;
    crate::queue::enqueue(queue, job).await?;
    info!(job_id = %job.id, job_type = %job.job_type, "Job enqueued");
    Ok(())
}
