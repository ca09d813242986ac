//! In-memory repository for tests and single-process runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PipelineRepository, RepositoryError};
use crate::models::{
    ContentItem, ContentStatus, Deck, Flashcard, Job, Question, Quiz, Summary, SummaryStatus,
};

#[derive(Default)]
struct Tables {
    jobs: HashMap<String, Job>,
    content: HashMap<String, ContentItem>,
    summaries: HashMap<String, Summary>,
    quizzes: HashMap<String, Quiz>,
    decks: HashMap<String, Deck>,
    cards: HashMap<String, Vec<Flashcard>>,
}

#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineRepository for InMemoryRepository {
    async fn get_job(&self, id: &str) -> Result<Option<Job>, RepositoryError> {
        Ok(self.tables.read().await.jobs.get(id).cloned())
    }

    async fn save_job(&self, job: &Job) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .jobs
            .insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| RepositoryError::not_found("job", &job.id))?;
        stored.status = job.status;
        stored.retry_count = job.retry_count;
        stored.error_message = job.error_message.clone();
        stored.completed_at = job.completed_at;
        Ok(())
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self.tables.read().await.content.get(id).cloned())
    }

    async fn save_content(&self, item: &ContentItem) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .content
            .insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update_content_status(
        &self,
        id: &str,
        status: ContentStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let item = tables
            .content
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("content item", id))?;
        item.status = status;
        Ok(())
    }

    async fn update_transcript(
        &self,
        id: &str,
        transcript: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let item = tables
            .content
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("content item", id))?;
        item.transcript = Some(transcript.to_string());
        item.metadata = metadata.clone();
        item.status = ContentStatus::Completed;
        Ok(())
    }

    async fn get_summary(&self, id: &str) -> Result<Option<Summary>, RepositoryError> {
        Ok(self.tables.read().await.summaries.get(id).cloned())
    }

    async fn save_summary(&self, summary: &Summary) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .summaries
            .insert(summary.id.clone(), summary.clone());
        Ok(())
    }

    async fn update_summary_content(
        &self,
        id: &str,
        raw_content: &str,
        content: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let summary = tables
            .summaries
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("summary", id))?;
        summary.raw_content = Some(raw_content.to_string());
        summary.content = Some(content.to_string());
        summary.status = SummaryStatus::Completed;
        Ok(())
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, RepositoryError> {
        Ok(self.tables.read().await.quizzes.get(id).cloned())
    }

    async fn save_quiz(&self, quiz: &Quiz) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .quizzes
            .insert(quiz.id.clone(), quiz.clone());
        Ok(())
    }

    async fn update_questions(
        &self,
        quiz_id: &str,
        questions: &[Question],
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let quiz = tables
            .quizzes
            .get_mut(quiz_id)
            .ok_or_else(|| RepositoryError::not_found("quiz", quiz_id))?;
        quiz.questions = questions.to_vec();
        Ok(())
    }

    async fn get_deck(&self, id: &str) -> Result<Option<Deck>, RepositoryError> {
        Ok(self.tables.read().await.decks.get(id).cloned())
    }

    async fn save_deck(&self, deck: &Deck) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .decks
            .insert(deck.id.clone(), deck.clone());
        Ok(())
    }

    async fn create_cards(
        &self,
        deck_id: &str,
        cards: &[Flashcard],
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.decks.contains_key(deck_id) {
            return Err(RepositoryError::not_found("deck", deck_id));
        }
        tables.cards.insert(deck_id.to_string(), cards.to_vec());
        Ok(())
    }

    async fn get_cards(&self, deck_id: &str) -> Result<Vec<Flashcard>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .cards
            .get(deck_id)
            .cloned()
            .unwrap_or_default())
    }
}
