//! Type-specific job handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::JobError;
use crate::acquisition::TranscriptChain;
use crate::llm::ModelClient;
use crate::models::{
    ContentItem, ContentStatus, FlashcardOptions, Job, JobType, QuizOptions, StatusEvent,
    Summary, SummaryOptions,
};
use crate::repository::PipelineRepository;
use crate::status::StatusPublisher;

pub const STEP_ANALYZING: &str = "Analyzing content";
pub const STEP_TRANSCRIPT: &str = "Extracting transcript";

/// What a successful handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub result_id: String,
    pub result_type: &'static str,
}

impl JobOutcome {
    fn new(result_id: impl Into<String>, result_type: &'static str) -> Self {
        Self {
            result_id: result_id.into(),
            result_type,
        }
    }
}

/// Runs one job. The worker loop owns locking and bookkeeping.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<JobOutcome, JobError>;
}

/// Rough seconds remaining when a job of this type starts.
pub fn initial_estimate(job_type: &JobType) -> u64 {
    match job_type {
        JobType::ContentProcessing => 60,
        JobType::SummaryGeneration => 90,
        JobType::QuizGeneration | JobType::FlashcardGeneration => 45,
        JobType::Unknown(_) => 0,
    }
}

/// Decode a job's option payload; a missing payload means defaults.
fn options<T: DeserializeOwned + Default>(job: &Job) -> Result<T, JobError> {
    if job.config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(job.config.clone())
        .map_err(|e| JobError::Permanent(format!("invalid {} options: {}", job.job_type, e)))
}

/// The production dispatch table.
pub struct PipelineHandlers {
    repo: Arc<dyn PipelineRepository>,
    chain: TranscriptChain,
    model: ModelClient,
    publisher: StatusPublisher,
}

impl PipelineHandlers {
    pub fn new(
        repo: Arc<dyn PipelineRepository>,
        chain: TranscriptChain,
        model: ModelClient,
        publisher: StatusPublisher,
    ) -> Self {
        Self {
            repo,
            chain,
            model,
            publisher,
        }
    }

    async fn progress(&self, job: &Job, step: u32, name: &str, remaining: u64) {
        self.publisher
            .publish(&job.user_id, StatusEvent::progress(&job.id, step, name, remaining))
            .await;
    }

    /// Run the acquisition chain and store the result on the content item.
    async fn acquire_transcript(
        &self,
        job: &Job,
        mut item: ContentItem,
    ) -> Result<String, JobError> {
        self.progress(job, 2, STEP_TRANSCRIPT, 45).await;
        self.repo
            .update_content_status(&item.id, ContentStatus::Processing)
            .await?;

        let transcript = self.chain.resolve(&item).await;
        if !item.metadata.is_object() {
            item.metadata = serde_json::json!({});
        }
        if let Some(map) = item.metadata.as_object_mut() {
            map.insert(
                "transcript_source".to_string(),
                serde_json::Value::String(transcript.source.as_str().to_string()),
            );
        }

        self.repo
            .update_transcript(&item.id, &transcript.text, &item.metadata)
            .await?;
        info!(
            job_id = %job.id,
            content_id = %item.id,
            source = transcript.source.as_str(),
            chars = transcript.text.len(),
            "Transcript stored"
        );
        Ok(transcript.text)
    }

    async fn process_content(&self, job: &Job) -> Result<JobOutcome, JobError> {
        let item = self
            .repo
            .get_content(&job.reference_id)
            .await?
            .ok_or_else(|| JobError::missing("content item", &job.reference_id))?;

        let content_id = item.id.clone();
        self.acquire_transcript(job, item).await?;
        Ok(JobOutcome::new(content_id, "content"))
    }

    async fn generate_summary(&self, job: &Job) -> Result<JobOutcome, JobError> {
        let opts: SummaryOptions = options(job)?;
        let summary = self
            .repo
            .get_summary(&job.reference_id)
            .await?
            .ok_or_else(|| JobError::missing("summary", &job.reference_id))?;
        let content_id = summary.content_id.clone().ok_or_else(|| {
            JobError::Permanent(format!("summary {} has no linked content", summary.id))
        })?;
        let item = self
            .repo
            .get_content(&content_id)
            .await?
            .ok_or_else(|| JobError::missing("content item", &content_id))?;

        let transcript = match item.usable_transcript() {
            Some(text) => {
                debug!(job_id = %job.id, content_id = %item.id, "Reusing stored transcript");
                text.to_string()
            }
            None => self.acquire_transcript(job, item).await?,
        };

        self.progress(job, 3, "Generating summary", 30).await;
        let text = self
            .model
            .generate_summary(&transcript, &summary.title, &opts)
            .await?;
        self.repo
            .update_summary_content(&summary.id, &transcript, &text)
            .await?;
        Ok(JobOutcome::new(summary.id, "summary"))
    }

    async fn summary_source(&self, summary_id: &str) -> Result<(Summary, String), JobError> {
        let summary = self
            .repo
            .get_summary(summary_id)
            .await?
            .ok_or_else(|| JobError::missing("summary", summary_id))?;
        let source = summary
            .source_text()
            .map(str::to_string)
            .ok_or_else(|| {
                JobError::Permanent(format!("summary {} has no source text", summary.id))
            })?;
        Ok((summary, source))
    }

    async fn generate_quiz(&self, job: &Job) -> Result<JobOutcome, JobError> {
        let opts: QuizOptions = options(job)?;
        let quiz = self
            .repo
            .get_quiz(&job.reference_id)
            .await?
            .ok_or_else(|| JobError::missing("quiz", &job.reference_id))?;
        let (_, source) = self.summary_source(&quiz.summary_id).await?;

        self.progress(job, 3, "Generating quiz", 30).await;
        let questions = self.model.generate_quiz(&source, &opts).await?;
        self.repo.update_questions(&quiz.id, &questions).await?;
        info!(job_id = %job.id, quiz_id = %quiz.id, questions = questions.len(), "Quiz stored");
        Ok(JobOutcome::new(quiz.id, "quiz"))
    }

    async fn generate_flashcards(&self, job: &Job) -> Result<JobOutcome, JobError> {
        let opts: FlashcardOptions = options(job)?;
        let deck = self
            .repo
            .get_deck(&job.reference_id)
            .await?
            .ok_or_else(|| JobError::missing("deck", &job.reference_id))?;
        let (_, source) = self.summary_source(&deck.summary_id).await?;

        self.progress(job, 3, "Generating flashcards", 30).await;
        let cards = self.model.generate_flashcards(&source, &opts).await?;
        self.repo.create_cards(&deck.id, &cards).await?;
        info!(job_id = %job.id, deck_id = %deck.id, cards = cards.len(), "Flashcards stored");
        Ok(JobOutcome::new(deck.id, "deck"))
    }
}

#[async_trait]
impl JobHandler for PipelineHandlers {
    async fn handle(&self, job: &Job) -> Result<JobOutcome, JobError> {
        match &job.job_type {
            JobType::ContentProcessing => self.process_content(job).await,
            JobType::SummaryGeneration => self.generate_summary(job).await,
            JobType::QuizGeneration => self.generate_quiz(job).await,
            JobType::FlashcardGeneration => self.generate_flashcards(job).await,
            JobType::Unknown(other) => {
                Err(JobError::Permanent(format!("unknown job type: {}", other)))
            }
        }
    }
}
