//! Data models for the job pipeline.

mod content;
mod event;
mod job;
mod options;
mod study;

pub use content::{ContentItem, ContentStatus, ContentType};
pub use event::{StatusEvent, ERROR_CODE_JOB_FAILED};
pub use job::{Job, JobStatus, JobType, DEFAULT_MAX_RETRIES};
pub use options::{
    AudienceLevel, Difficulty, FlashcardOptions, LengthPreset, QuestionType, QuizOptions,
    SummaryFormat, SummaryOptions,
};
pub use study::{Deck, Flashcard, Question, Quiz, Summary, SummaryStatus};
