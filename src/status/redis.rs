//! Redis pub/sub sink.
//!
//! Pub/sub is not durable: events published while the gateway is
//! disconnected are lost, which is acceptable for progress notifications.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{EventSink, PublishError};

pub struct RedisPubSubSink {
    conn: ConnectionManager,
}

impl RedisPubSubSink {
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EventSink for RedisPubSubSink {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), PublishError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .map_err(|e| PublishError::Backend(e.to_string()))
    }
}
