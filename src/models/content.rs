//! Content items: uploaded files or video links awaiting a transcript.

use serde::{Deserialize, Serialize};

/// Where a content item comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Youtube,
    File,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::File => "file",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "youtube" => Some(Self::Youtube),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Processing status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ContentStatus {
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
}

/// A lecture video link or uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub status: ContentStatus,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ContentItem {
    /// A pending youtube content item.
    pub fn youtube(
        id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            content_type: ContentType::Youtube,
            title: title.into(),
            status: ContentStatus::Pending,
            source_url: Some(url.into()),
            file_path: None,
            transcript: None,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    /// A pending uploaded-file content item.
    pub fn file(
        id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            content_type: ContentType::File,
            title: title.into(),
            status: ContentStatus::Pending,
            source_url: None,
            file_path: Some(path.into()),
            transcript: None,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    /// The stored transcript, if it has any non-whitespace text.
    pub fn usable_transcript(&self) -> Option<&str> {
        self.transcript
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}
