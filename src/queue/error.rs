//! Queue store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(String),
    #[error("Failed to encode job: {0}")]
    Encode(String),
    /// The entry was removed from the queue but is not a valid job record.
    #[error("Malformed entry on {queue}: {message}")]
    Decode { queue: String, message: String },
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Backend(e.to_string())
    }
}
