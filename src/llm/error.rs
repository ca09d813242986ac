use thiserror::Error;

use crate::rate_limit::SlotError;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Model API rate limited")]
    RateLimited,
    #[error("Model not configured: {0}")]
    NotConfigured(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Slot(#[from] SlotError),
}

impl LlmError {
    /// Network, timeout and rate-limit failures worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::RateLimited | Self::Slot(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::NotConfigured(_) | Self::Parse(_) | Self::Validation(_) => false,
        }
    }

    /// The model answered but the answer was unusable.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Validation(_))
    }
}
