//! Shared fakes and wiring for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use lectern::acquisition::{
    AcquisitionConfig, AcquisitionError, AudioResolver, AudioStream, CaptionSource,
    TranscriptChain,
};
use lectern::http_client::{HttpError, WebFetcher};
use lectern::llm::{GenerativeModel, LlmError, ModelClient};
use lectern::lock::{InMemoryLockBackend, JobLock, DEFAULT_LOCK_TTL};
use lectern::models::{Job, StatusEvent};
use lectern::queue::InMemoryQueue;
use lectern::rate_limit::RateSlots;
use lectern::repository::{InMemoryRepository, PipelineRepository};
use lectern::status::{BroadcastSink, ChannelMessage, StatusPublisher};
use lectern::worker::{submit_job, JobHandler, PipelineHandlers, PoolOptions, WorkerDeps, WorkerPool};

/// Canned model replies; `Err` strings become connection errors.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    transcripts: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn with_transcripts(mut self, transcripts: Vec<Result<String, String>>) -> Self {
        self.transcripts = Mutex::new(transcripts.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn answer(&self, queue: &Mutex<VecDeque<Result<String, String>>>) -> Result<String, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = queue.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match reply {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LlmError::Connection(message)),
            None => Err(LlmError::Connection("script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer(&self.replies).await
    }

    async fn transcribe(&self, _media: &[u8], _mime_type: &str) -> Result<String, LlmError> {
        self.answer(&self.transcripts).await
    }
}

/// Caption API returning a fixed result.
pub struct FakeCaptions(pub Result<String, ()>);

#[async_trait]
impl CaptionSource for FakeCaptions {
    async fn fetch_captions(
        &self,
        _video_id: &str,
        _languages: &[String],
    ) -> Result<String, AcquisitionError> {
        self.0.clone().map_err(|_| AcquisitionError::NoCaptions)
    }
}

/// Routes requests by URL substring; unmatched URLs fail with 404.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Vec<(String, Vec<u8>)>,
}

impl FakeFetcher {
    pub fn route(mut self, needle: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.push((needle.to_string(), body.into()));
        self
    }

    fn lookup(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        self.routes
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| HttpError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

#[async_trait]
impl WebFetcher for FakeFetcher {
    async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        Ok(String::from_utf8_lossy(&self.lookup(url)?).into_owned())
    }

    async fn get_bytes(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>, HttpError> {
        let body = self.lookup(url)?;
        if body.len() as u64 > max_bytes {
            return Err(HttpError::TooLarge { limit: max_bytes });
        }
        Ok(body)
    }
}

/// Audio resolver returning a fixed stream, or failing.
pub struct FakeAudio(pub Option<AudioStream>);

#[async_trait]
impl AudioResolver for FakeAudio {
    async fn resolve(&self, _source_url: &str) -> Result<AudioStream, AcquisitionError> {
        self.0
            .clone()
            .ok_or_else(|| AcquisitionError::AudioUnavailable("no audio-only formats".to_string()))
    }
}

pub fn audio_stream(url: &str) -> AudioStream {
    AudioStream {
        url: url.to_string(),
        mime_type: "audio/webm".to_string(),
        bitrate: 128.0,
        filesize: None,
    }
}

pub fn chain(
    captions: FakeCaptions,
    fetcher: FakeFetcher,
    audio: FakeAudio,
    model: ModelClient,
    audio_cap_bytes: u64,
) -> TranscriptChain {
    TranscriptChain::new(
        Arc::new(captions),
        Arc::new(fetcher),
        Arc::new(audio),
        model,
        AcquisitionConfig {
            audio_cap_bytes,
            ..Default::default()
        },
    )
}

/// In-process backends plus an event subscription.
pub struct Harness {
    pub queue: InMemoryQueue,
    pub locks: InMemoryLockBackend,
    pub repo: InMemoryRepository,
    pub sink: BroadcastSink,
    events: broadcast::Receiver<ChannelMessage>,
}

impl Harness {
    pub fn new() -> Self {
        let sink = BroadcastSink::new(1024);
        let events = sink.subscribe();
        Self {
            queue: InMemoryQueue::new(),
            locks: InMemoryLockBackend::new(),
            repo: InMemoryRepository::new(),
            sink,
            events,
        }
    }

    pub fn publisher(&self) -> StatusPublisher {
        StatusPublisher::new(Arc::new(self.sink.clone()))
    }

    /// Handlers backed by a scripted model and a fully failing acquisition chain.
    pub fn pipeline_handlers(&self, model: Arc<ScriptedModel>, slots: usize) -> PipelineHandlers {
        let client = ModelClient::new(model, RateSlots::new(slots));
        let chain = chain(
            FakeCaptions(Err(())),
            FakeFetcher::default(),
            FakeAudio(None),
            client.clone(),
            1024,
        );
        PipelineHandlers::new(Arc::new(self.repo.clone()), chain, client, self.publisher())
    }

    pub fn pool(&self, handler: Arc<dyn JobHandler>, options: PoolOptions) -> WorkerPool {
        WorkerPool::new(
            WorkerDeps {
                queue: Arc::new(self.queue.clone()),
                lock: JobLock::new(Arc::new(self.locks.clone()), DEFAULT_LOCK_TTL, "test"),
                repo: Arc::new(self.repo.clone()),
                handler,
                publisher: self.publisher(),
            },
            options,
        )
    }

    pub async fn submit(&self, job: &Job) {
        submit_job(&self.repo, &self.queue, job).await.unwrap();
    }

    /// Poll until `done` holds for the stored job, or panic after `limit`.
    pub async fn wait_for_job(&self, job_id: &str, limit: Duration, done: impl Fn(&Job) -> bool) -> Job {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if let Some(job) = self.repo.get_job(job_id).await.unwrap() {
                if done(&job) {
                    return job;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("job {} did not reach the expected state", job_id);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Every event published so far, decoded.
    pub fn drain_events(&mut self) -> Vec<StatusEvent> {
        let mut out = Vec::new();
        while let Ok(msg) = self.events.try_recv() {
            out.push(serde_json::from_str(&msg.payload).unwrap());
        }
        out
    }
}

pub fn fast_options() -> PoolOptions {
    PoolOptions {
        pop_timeout: Duration::from_millis(50),
        ..Default::default()
    }
}
