//! Job records: the unit of asynchronous work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retries allowed before a job is marked terminally failed.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Kind of work a job performs.
///
/// Unrecognized type strings are preserved in `Unknown` so that a
/// malformed producer entry still deserializes and fails through the
/// normal retry bookkeeping instead of being dropped at the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    ContentProcessing,
    SummaryGeneration,
    QuizGeneration,
    FlashcardGeneration,
    Unknown(String),
}

impl JobType {
    /// All dispatchable job types, in queue polling order.
    pub const KNOWN: [JobType; 4] = [
        JobType::ContentProcessing,
        JobType::SummaryGeneration,
        JobType::QuizGeneration,
        JobType::FlashcardGeneration,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::ContentProcessing => "content-processing",
            Self::SummaryGeneration => "summary-generation",
            Self::QuizGeneration => "quiz-generation",
            Self::FlashcardGeneration => "flashcard-generation",
            Self::Unknown(s) => s,
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "content-processing" => Self::ContentProcessing,
            "summary-generation" => Self::SummaryGeneration,
            "quiz-generation" => Self::QuizGeneration,
            "flashcard-generation" => Self::FlashcardGeneration,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Name of the queue that carries jobs of this type.
    pub fn queue_name(&self) -> String {
        format!("jobs:{}", self.as_str())
    }
}

impl From<String> for JobType {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<JobType> for String {
    fn from(t: JobType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether no further processing will happen for this job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A unit of asynchronous work. Serialized verbatim onto the queues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Domain entity (content item, summary, quiz or deck) this job updates.
    pub reference_id: String,
    /// Type-specific options, opaque to the worker loop.
    #[serde(default)]
    pub config: serde_json::Value,
    pub status: JobStatus,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Job {
    /// Create a new pending job with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        job_type: JobType,
        reference_id: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            job_type,
            reference_id: reference_id.into(),
            config,
            status: JobStatus::Pending,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.error_message = None;
        self.completed_at = Some(Utc::now());
    }

    /// Cooperative cancellation: only prevents future dispatch.
    pub fn cancel(&mut self) {
        self.status = JobStatus::Failed;
        self.error_message = Some("cancelled".to_string());
        self.completed_at = Some(Utc::now());
    }
}
