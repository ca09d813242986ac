//! Study artifacts produced by the generation jobs.

use serde::{Deserialize, Serialize};

use super::options::{Difficulty, QuestionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Pending,
    Completed,
    Failed,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A generated summary of one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: String,
    pub user_id: String,
    /// Content item the summary is generated from.
    pub content_id: Option<String>,
    pub title: String,
    /// Source text the summary was generated from; quizzes and decks
    /// are generated against this.
    pub raw_content: Option<String>,
    /// Generated summary text.
    pub content: Option<String>,
    pub status: SummaryStatus,
}

impl Summary {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        content_id: Option<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            content_id,
            title: title.into(),
            raw_content: None,
            content: None,
            status: SummaryStatus::Pending,
        }
    }

    /// Source text for quiz/deck generation, if the summary has any.
    pub fn source_text(&self) -> Option<&str> {
        self.raw_content
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// One validated quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub user_id: String,
    pub summary_id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        summary_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            summary_id: summary_id.into(),
            title: title.into(),
            questions: Vec::new(),
        }
    }
}

/// One validated flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub mnemonic: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub user_id: String,
    pub summary_id: String,
    pub title: String,
}

impl Deck {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        summary_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            summary_id: summary_id.into(),
            title: title.into(),
        }
    }
}
