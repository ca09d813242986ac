//! Worker pool command.

use std::sync::Arc;

use tracing::{info, warn};

use super::backends;
use crate::acquisition::{TimedTextCaptions, TranscriptChain, YtDlpResolver};
use crate::config::Settings;
use crate::http_client::HttpClient;
use crate::llm::{GeminiModel, ModelClient};
use crate::lock::JobLock;
use crate::rate_limit::RateSlots;
use crate::retry::RetryPolicy;
use crate::status::StatusPublisher;
use crate::worker::{PipelineHandlers, PoolOptions, WorkerDeps, WorkerPool};

/// Run workers until Ctrl-C.
pub async fn cmd_work(settings: &Settings) -> anyhow::Result<()> {
    let backends = backends::connect(settings).await?;
    let repo = Arc::new(backends::open_repository(settings).await?);
    let publisher = StatusPublisher::new(backends.events);

    let model = GeminiModel::new(settings.llm.clone())?;
    let slots = RateSlots::with_wait(settings.model_concurrency, settings.slot_wait);
    let client = ModelClient::new(Arc::new(model), slots);

    let fetcher = Arc::new(HttpClient::new(settings.http_timeout)?);
    let audio = YtDlpResolver::new();
    if !audio.is_available() {
        warn!("yt-dlp not found, audio transcription fallback is disabled");
    }
    let chain = TranscriptChain::new(
        Arc::new(TimedTextCaptions::new(fetcher.clone())),
        fetcher,
        Arc::new(audio),
        client.clone(),
        settings.acquisition(),
    );

    let handler = PipelineHandlers::new(repo.clone(), chain, client, publisher.clone());
    let mut pool = WorkerPool::new(
        WorkerDeps {
            queue: backends.queue,
            lock: JobLock::new(backends.lock, settings.lock_ttl, "lectern"),
            repo,
            handler: Arc::new(handler),
            publisher,
        },
        PoolOptions {
            pop_timeout: settings.pop_timeout,
            retry: RetryPolicy::new(settings.retry_base),
        },
    );

    pool.start(settings.worker_count);
    info!(
        workers = settings.worker_count,
        model_concurrency = settings.model_concurrency,
        "Waiting for jobs (Ctrl-C to stop)"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down after in-flight jobs finish");
    pool.stop().await;
    Ok(())
}
