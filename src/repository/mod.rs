//! Persistence consumed by the pipeline.
//!
//! The pipeline only reads and writes the fields it owns on Job, Content,
//! Summary, Quiz and Deck records. Backends:
//! - In-memory (tests, single process)
//! - SQLite through Diesel

pub mod diesel_models;
pub mod diesel_pipeline;
pub mod diesel_pool;
mod memory;
pub mod util;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    ContentItem, ContentStatus, Deck, Flashcard, Job, Question, Quiz, Summary,
};

pub use diesel_pipeline::DieselPipelineRepository;
pub use diesel_pool::{AsyncSqlitePool, DieselError};
pub use memory::InMemoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] DieselError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[async_trait]
pub trait PipelineRepository: Send + Sync {
    async fn get_job(&self, id: &str) -> Result<Option<Job>, RepositoryError>;
    /// Insert or replace a job record.
    async fn save_job(&self, job: &Job) -> Result<(), RepositoryError>;
    /// Persist the lifecycle fields of an existing job.
    async fn update_job(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, RepositoryError>;
    async fn save_content(&self, item: &ContentItem) -> Result<(), RepositoryError>;
    async fn update_content_status(
        &self,
        id: &str,
        status: ContentStatus,
    ) -> Result<(), RepositoryError>;
    /// Store a resolved transcript and mark the item completed in one write.
    async fn update_transcript(
        &self,
        id: &str,
        transcript: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), RepositoryError>;

    async fn get_summary(&self, id: &str) -> Result<Option<Summary>, RepositoryError>;
    async fn save_summary(&self, summary: &Summary) -> Result<(), RepositoryError>;
    /// Store generated summary text with its source text and mark it completed.
    async fn update_summary_content(
        &self,
        id: &str,
        raw_content: &str,
        content: &str,
    ) -> Result<(), RepositoryError>;

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, RepositoryError>;
    async fn save_quiz(&self, quiz: &Quiz) -> Result<(), RepositoryError>;
    async fn update_questions(
        &self,
        quiz_id: &str,
        questions: &[Question],
    ) -> Result<(), RepositoryError>;

    async fn get_deck(&self, id: &str) -> Result<Option<Deck>, RepositoryError>;
    async fn save_deck(&self, deck: &Deck) -> Result<(), RepositoryError>;
    /// Replace the cards of a deck.
    async fn create_cards(&self, deck_id: &str, cards: &[Flashcard])
        -> Result<(), RepositoryError>;
    async fn get_cards(&self, deck_id: &str) -> Result<Vec<Flashcard>, RepositoryError>;
}
