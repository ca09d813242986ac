//! Diesel-based pipeline repository for SQLite.

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::diesel_models::{
    ContentRecord, DeckRecord, FlashcardRecord, JobRecord, NewFlashcard, QuizRecord, SummaryRecord,
};
use super::diesel_pool::AsyncSqlitePool;
use super::util::{parse_datetime, parse_datetime_opt};
use super::{PipelineRepository, RepositoryError};
use crate::models::{
    ContentItem, ContentStatus, ContentType, Deck, Difficulty, Flashcard, Job, JobStatus,
    JobType, Question, Quiz, Summary, SummaryStatus,
};
use crate::schema::{content_items, decks, flashcards, jobs, quizzes, summaries};

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Job {
            id: record.id,
            user_id: record.user_id,
            job_type: JobType::from_str(&record.job_type),
            reference_id: record.reference_id,
            config: serde_json::from_str(&record.config).unwrap_or_default(),
            status: JobStatus::from_str(&record.status).unwrap_or(JobStatus::Pending),
            retry_count: record.retry_count.max(0) as u32,
            max_retries: record.max_retries.max(0) as u32,
            error_message: record.error_message,
            created_at: parse_datetime(&record.created_at),
            completed_at: parse_datetime_opt(record.completed_at),
        }
    }
}

impl From<&Job> for JobRecord {
    fn from(job: &Job) -> Self {
        JobRecord {
            id: job.id.clone(),
            user_id: job.user_id.clone(),
            job_type: job.job_type.as_str().to_string(),
            reference_id: job.reference_id.clone(),
            config: job.config.to_string(),
            status: job.status.as_str().to_string(),
            retry_count: job.retry_count as i32,
            max_retries: job.max_retries as i32,
            error_message: job.error_message.clone(),
            created_at: job.created_at.to_rfc3339(),
            completed_at: job.completed_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

impl From<ContentRecord> for ContentItem {
    fn from(record: ContentRecord) -> Self {
        ContentItem {
            id: record.id,
            user_id: record.user_id,
            content_type: ContentType::from_str(&record.content_type).unwrap_or(ContentType::File),
            title: record.title,
            status: ContentStatus::from_str(&record.status).unwrap_or(ContentStatus::Pending),
            source_url: record.source_url,
            file_path: record.file_path,
            transcript: record.transcript,
            metadata: serde_json::from_str(&record.metadata)
                .unwrap_or_else(|_| serde_json::json!({})),
        }
    }
}

impl From<SummaryRecord> for Summary {
    fn from(record: SummaryRecord) -> Self {
        Summary {
            id: record.id,
            user_id: record.user_id,
            content_id: record.content_id,
            title: record.title,
            raw_content: record.raw_content,
            content: record.content,
            status: SummaryStatus::from_str(&record.status).unwrap_or(SummaryStatus::Pending),
        }
    }
}

impl From<DeckRecord> for Deck {
    fn from(record: DeckRecord) -> Self {
        Deck {
            id: record.id,
            user_id: record.user_id,
            summary_id: record.summary_id,
            title: record.title,
        }
    }
}

impl From<FlashcardRecord> for Flashcard {
    fn from(record: FlashcardRecord) -> Self {
        Flashcard {
            front: record.front,
            back: record.back,
            mnemonic: record.mnemonic,
            example: record.example,
            difficulty: Difficulty::from_str(&record.difficulty).unwrap_or_default(),
            topic: record.topic,
        }
    }
}

/// SQLite-backed pipeline repository.
#[derive(Clone)]
pub struct DieselPipelineRepository {
    pool: AsyncSqlitePool,
}

impl DieselPipelineRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `database_url`, creating missing tables.
    pub async fn open(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = AsyncSqlitePool::new(database_url);
        pool.init_schema().await?;
        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl PipelineRepository for DieselPipelineRepository {
    async fn get_job(&self, id: &str) -> Result<Option<Job>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let record = jobs::table
            .find(id)
            .first::<JobRecord>(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Job::from))
    }

    async fn save_job(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;

        diesel::replace_into(jobs::table)
            .values(&JobRecord::from(job))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let completed_at = job.completed_at.map(|dt| dt.to_rfc3339());

        let rows = diesel::update(jobs::table.find(&job.id))
            .set((
                jobs::status.eq(job.status.as_str()),
                jobs::retry_count.eq(job.retry_count as i32),
                jobs::error_message.eq(&job.error_message),
                jobs::completed_at.eq(&completed_at),
            ))
            .execute(&mut conn)
            .await?;

        if rows == 0 {
            return Err(RepositoryError::not_found("job", &job.id));
        }
        Ok(())
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let record = content_items::table
            .find(id)
            .first::<ContentRecord>(&mut conn)
            .await
            .optional()?;
        Ok(record.map(ContentItem::from))
    }

    async fn save_content(&self, item: &ContentItem) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let metadata = serde_json::to_string(&item.metadata)?;

        diesel::replace_into(content_items::table)
            .values((
                content_items::id.eq(&item.id),
                content_items::user_id.eq(&item.user_id),
                content_items::content_type.eq(item.content_type.as_str()),
                content_items::title.eq(&item.title),
                content_items::status.eq(item.status.as_str()),
                content_items::source_url.eq(&item.source_url),
                content_items::file_path.eq(&item.file_path),
                content_items::transcript.eq(&item.transcript),
                content_items::metadata.eq(&metadata),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn update_content_status(
        &self,
        id: &str,
        status: ContentStatus,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(content_items::table.find(id))
            .set(content_items::status.eq(status.as_str()))
            .execute(&mut conn)
            .await?;

        if rows == 0 {
            return Err(RepositoryError::not_found("content item", id));
        }
        Ok(())
    }

    async fn update_transcript(
        &self,
        id: &str,
        transcript: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let metadata = serde_json::to_string(metadata)?;

        let rows = diesel::update(content_items::table.find(id))
            .set((
                content_items::transcript.eq(Some(transcript)),
                content_items::metadata.eq(&metadata),
                content_items::status.eq(ContentStatus::Completed.as_str()),
            ))
            .execute(&mut conn)
            .await?;

        if rows == 0 {
            return Err(RepositoryError::not_found("content item", id));
        }
        Ok(())
    }

    async fn get_summary(&self, id: &str) -> Result<Option<Summary>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let record = summaries::table
            .find(id)
            .first::<SummaryRecord>(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Summary::from))
    }

    async fn save_summary(&self, summary: &Summary) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;

        diesel::replace_into(summaries::table)
            .values((
                summaries::id.eq(&summary.id),
                summaries::user_id.eq(&summary.user_id),
                summaries::content_id.eq(&summary.content_id),
                summaries::title.eq(&summary.title),
                summaries::raw_content.eq(&summary.raw_content),
                summaries::content.eq(&summary.content),
                summaries::status.eq(summary.status.as_str()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn update_summary_content(
        &self,
        id: &str,
        raw_content: &str,
        content: &str,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(summaries::table.find(id))
            .set((
                summaries::raw_content.eq(Some(raw_content)),
                summaries::content.eq(Some(content)),
                summaries::status.eq(SummaryStatus::Completed.as_str()),
            ))
            .execute(&mut conn)
            .await?;

        if rows == 0 {
            return Err(RepositoryError::not_found("summary", id));
        }
        Ok(())
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let record = quizzes::table
            .find(id)
            .first::<QuizRecord>(&mut conn)
            .await
            .optional()?;

        match record {
            Some(r) => Ok(Some(Quiz {
                questions: serde_json::from_str(&r.questions)?,
                id: r.id,
                user_id: r.user_id,
                summary_id: r.summary_id,
                title: r.title,
            })),
            None => Ok(None),
        }
    }

    async fn save_quiz(&self, quiz: &Quiz) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let questions = serde_json::to_string(&quiz.questions)?;

        diesel::replace_into(quizzes::table)
            .values((
                quizzes::id.eq(&quiz.id),
                quizzes::user_id.eq(&quiz.user_id),
                quizzes::summary_id.eq(&quiz.summary_id),
                quizzes::title.eq(&quiz.title),
                quizzes::questions.eq(&questions),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn update_questions(
        &self,
        quiz_id: &str,
        questions: &[Question],
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let questions = serde_json::to_string(questions)?;

        let rows = diesel::update(quizzes::table.find(quiz_id))
            .set(quizzes::questions.eq(&questions))
            .execute(&mut conn)
            .await?;

        if rows == 0 {
            return Err(RepositoryError::not_found("quiz", quiz_id));
        }
        Ok(())
    }

    async fn get_deck(&self, id: &str) -> Result<Option<Deck>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let record = decks::table
            .find(id)
            .first::<DeckRecord>(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Deck::from))
    }

    async fn save_deck(&self, deck: &Deck) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;

        diesel::replace_into(decks::table)
            .values((
                decks::id.eq(&deck.id),
                decks::user_id.eq(&deck.user_id),
                decks::summary_id.eq(&deck.summary_id),
                decks::title.eq(&deck.title),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn create_cards(
        &self,
        deck_id: &str,
        cards: &[Flashcard],
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;

        // Replace the whole set or nothing. The delete runs first so the
        // transaction holds the write lock from its first statement.
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                diesel::delete(flashcards::table.filter(flashcards::deck_id.eq(deck_id)))
                    .execute(conn)
                    .await?;

                let decks_found: i64 = decks::table
                    .filter(decks::id.eq(deck_id))
                    .select(diesel::dsl::count_star())
                    .first(conn)
                    .await?;
                if decks_found == 0 {
                    return Err(RepositoryError::not_found("deck", deck_id));
                }

                for (position, card) in cards.iter().enumerate() {
                    let new_card = NewFlashcard {
                        deck_id,
                        position: position as i32,
                        front: &card.front,
                        back: &card.back,
                        mnemonic: card.mnemonic.as_deref(),
                        example: card.example.as_deref(),
                        difficulty: card.difficulty.as_str(),
                        topic: card.topic.as_deref(),
                    };
                    diesel::insert_into(flashcards::table)
                        .values(&new_card)
                        .execute(conn)
                        .await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn get_cards(&self, deck_id: &str) -> Result<Vec<Flashcard>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let records = flashcards::table
            .filter(flashcards::deck_id.eq(deck_id))
            .order(flashcards::position.asc())
            .load::<FlashcardRecord>(&mut conn)
            .await?;
        Ok(records.into_iter().map(Flashcard::from).collect())
    }
}
