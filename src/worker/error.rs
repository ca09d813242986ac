//! Job failure taxonomy.

use thiserror::Error;

use crate::llm::LlmError;
use crate::queue::QueueError;
use crate::repository::RepositoryError;

/// Why a handler failed. Every kind goes through the same retry counting;
/// the kind only shapes logging.
#[derive(Debug, Error)]
pub enum JobError {
    /// Network, timeout or rate-limit failure at an external boundary.
    #[error("{0}")]
    Transient(String),
    /// Model output unusable after repair.
    #[error("{0}")]
    Validation(String),
    /// Unknown job type, missing linkage, bad payload.
    #[error("{0}")]
    Permanent(String),
}

impl JobError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Validation(_) => "validation",
            Self::Permanent(_) => "permanent",
        }
    }

    pub(crate) fn missing(entity: &str, id: &str) -> Self {
        Self::Permanent(format!("{} {} not found", entity, id))
    }
}

/// Failure to hand a new job to the pipeline.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl From<LlmError> for JobError {
    fn from(e: LlmError) -> Self {
        if e.is_validation() {
            Self::Validation(e.to_string())
        } else if e.is_transient() {
            Self::Transient(e.to_string())
        } else {
            Self::Permanent(e.to_string())
        }
    }
}

impl From<RepositoryError> for JobError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Database(_) => Self::Transient(e.to_string()),
            RepositoryError::NotFound { .. } | RepositoryError::Serialization(_) => {
                Self::Permanent(e.to_string())
            }
        }
    }
}
