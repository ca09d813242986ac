//! Model client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the Gemini backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (GEMINI_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model name, e.g. "gemini-1.5-flash"
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Temperature for text generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens in a reply
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_request_timeout_secs() -> u64 {
    240
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl LlmConfig {
    pub(crate) fn base_default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GEMINI_API_KEY`: API key
    /// - `GEMINI_MODEL`: Model name
    /// - `GEMINI_ENDPOINT`: API base URL
    /// - `GEMINI_TEMPERATURE`: Generation temperature
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("GEMINI_API_KEY") {
            if !val.is_empty() {
                self.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("GEMINI_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("GEMINI_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("GEMINI_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                self.temperature = t;
            }
        }
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}
