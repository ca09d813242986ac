//! Status events delivered to the originating user's live session.

use serde::{Deserialize, Serialize};

/// Stable error code carried by terminal `error` events.
pub const ERROR_CODE_JOB_FAILED: &str = "JOB_FAILED";

/// Progress, completion or error notification for a job.
///
/// Serializes as `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StatusEvent {
    StatusUpdate {
        job_id: String,
        step: u32,
        step_name: String,
        estimated_seconds_remaining: u64,
    },
    Completed {
        job_id: String,
        result_id: String,
        result_type: String,
    },
    Error {
        job_id: String,
        error_code: String,
        error_message: String,
    },
}

impl StatusEvent {
    pub fn progress(
        job_id: impl Into<String>,
        step: u32,
        step_name: impl Into<String>,
        estimated_seconds_remaining: u64,
    ) -> Self {
        Self::StatusUpdate {
            job_id: job_id.into(),
            step,
            step_name: step_name.into(),
            estimated_seconds_remaining,
        }
    }

    pub fn completed(
        job_id: impl Into<String>,
        result_id: impl Into<String>,
        result_type: impl Into<String>,
    ) -> Self {
        Self::Completed {
            job_id: job_id.into(),
            result_id: result_id.into(),
            result_type: result_type.into(),
        }
    }

    pub fn failed(job_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self::Error {
            job_id: job_id.into(),
            error_code: ERROR_CODE_JOB_FAILED.to_string(),
            error_message: error_message.into(),
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            Self::StatusUpdate { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Error { job_id, .. } => job_id,
        }
    }

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusUpdate { .. } => "status_update",
            Self::Completed { .. } => "completed",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_wire_shape() {
        let event = StatusEvent::progress("j1", 1, "Analyzing content", 30);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "status_update",
                "payload": {
                    "job_id": "j1",
                    "step": 1,
                    "step_name": "Analyzing content",
                    "estimated_seconds_remaining": 30
                }
            })
        );
    }

    #[test]
    fn test_error_event_carries_stable_code() {
        let event = StatusEvent::failed("j1", "boom");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["payload"]["error_code"], "JOB_FAILED");
        assert_eq!(value["payload"]["error_message"], "boom");
    }

    #[test]
    fn test_completed_event_wire_shape() {
        let event = StatusEvent::completed("j1", "s9", "summary");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "completed");
        assert_eq!(value["payload"]["result_id"], "s9");
        assert_eq!(value["payload"]["result_type"], "summary");
        assert_eq!(event.kind(), "completed");
        assert_eq!(event.job_id(), "j1");
    }
}
