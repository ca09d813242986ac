//! In-process broadcast sink.
//!
//! Delivers every event to all subscribers; the gateway filters by
//! channel. Having no subscribers is not an error.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{EventSink, PublishError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel: String,
    pub payload: String,
}

#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ChannelMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), PublishError> {
        // Err only means nobody is listening right now.
        let _ = self.tx.send(ChannelMessage {
            channel: channel.to_string(),
            payload,
        });
        Ok(())
    }
}
