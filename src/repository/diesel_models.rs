//! Diesel ORM models for the pipeline tables.

use diesel::prelude::*;

use crate::schema;

/// Job record from the database.
#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRecord {
    pub id: String,
    pub user_id: String,
    pub job_type: String,
    pub reference_id: String,
    pub config: String,
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Content item record from the database.
#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::content_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ContentRecord {
    pub id: String,
    pub user_id: String,
    pub content_type: String,
    pub title: String,
    pub status: String,
    pub source_url: Option<String>,
    pub file_path: Option<String>,
    pub transcript: Option<String>,
    pub metadata: String,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::summaries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SummaryRecord {
    pub id: String,
    pub user_id: String,
    pub content_id: Option<String>,
    pub title: String,
    pub raw_content: Option<String>,
    pub content: Option<String>,
    pub status: String,
}

/// Quiz record; questions are stored as a JSON array.
#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::quizzes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuizRecord {
    pub id: String,
    pub user_id: String,
    pub summary_id: String,
    pub title: String,
    pub questions: String,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::decks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeckRecord {
    pub id: String,
    pub user_id: String,
    pub summary_id: String,
    pub title: String,
}

/// Flashcard record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::flashcards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FlashcardRecord {
    pub id: i32,
    pub deck_id: String,
    pub position: i32,
    pub front: String,
    pub back: String,
    pub mnemonic: Option<String>,
    pub example: Option<String>,
    pub difficulty: String,
    pub topic: Option<String>,
}

/// New flashcard for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::flashcards)]
pub struct NewFlashcard<'a> {
    pub deck_id: &'a str,
    pub position: i32,
    pub front: &'a str,
    pub back: &'a str,
    pub mnemonic: Option<&'a str>,
    pub example: Option<&'a str>,
    pub difficulty: &'a str,
    pub topic: Option<&'a str>,
}
