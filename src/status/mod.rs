//! Status publisher: progress, completion and error events per user.
//!
//! Events go to a per-user broadcast channel consumed by the real-time
//! gateway. Publishing is best-effort: failures are logged and never
//! change a job's outcome.

mod broadcast;
#[cfg(feature = "redis-backend")]
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::StatusEvent;

pub use broadcast::{BroadcastSink, ChannelMessage};
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisPubSubSink;

/// Upper bound on how long a single publish may take.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Publish backend error: {0}")]
    Backend(String),
    #[error("Failed to serialize event: {0}")]
    Serialize(String),
}

/// Transport for serialized events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), PublishError>;
}

/// Broadcast channel name for a user.
pub fn user_channel(user_id: &str) -> String {
    format!("user:{}:jobs", user_id)
}

#[derive(Clone)]
pub struct StatusPublisher {
    sink: Arc<dyn EventSink>,
}

impl StatusPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Fire an event at the user's channel. Never fails.
    pub async fn publish(&self, user_id: &str, event: StatusEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(job_id = event.job_id(), error = %e, "Failed to serialize status event");
                return;
            }
        };

        let channel = user_channel(user_id);
        match tokio::time::timeout(PUBLISH_TIMEOUT, self.sink.publish(&channel, payload)).await {
            Ok(Ok(())) => debug!(
                job_id = event.job_id(),
                kind = event.kind(),
                %channel,
                "status event published"
            ),
            Ok(Err(e)) => warn!(job_id = event.job_id(), error = %e, "Status publish failed"),
            Err(_) => warn!(job_id = event.job_id(), "Status publish timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn publish(&self, _channel: &str, _payload: String) -> Result<(), PublishError> {
            Err(PublishError::Backend("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_publish_delivers_serialized_event_on_user_channel() {
        let sink = Arc::new(BroadcastSink::new(16));
        let mut rx = sink.subscribe();
        let publisher = StatusPublisher::new(sink);

        publisher
            .publish("u1", StatusEvent::completed("j1", "s1", "summary"))
            .await;

        let message = rx.recv().await.unwrap();
        assert_eq!(message.channel, "user:u1:jobs");
        let event: StatusEvent = serde_json::from_str(&message.payload).unwrap();
        assert_eq!(event, StatusEvent::completed("j1", "s1", "summary"));
    }

    #[tokio::test]
    async fn test_publish_swallows_sink_failures() {
        let publisher = StatusPublisher::new(Arc::new(FailingSink));
        publisher
            .publish("u1", StatusEvent::failed("j1", "boom"))
            .await;
    }
}
