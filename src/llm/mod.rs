//! Rate-limited generative model client.
//!
//! Every call goes through [`ModelClient`], which holds one rate slot for
//! the whole external-call duration, builds layered prompts and treats the
//! model's reply as an untrusted payload: fences are stripped, structured
//! output is parsed with a fallback substring search, and quiz/flashcard
//! items are validated and repaired before they are returned.

mod client;
mod config;
mod error;
mod gemini;
pub mod prompts;
pub mod response;
pub mod validate;

use async_trait::async_trait;

pub use client::ModelClient;
pub use config::LlmConfig;
pub use error::LlmError;
pub use gemini::GeminiModel;

/// External generative-AI API.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run a text prompt and return the raw reply text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Transcribe audio/video bytes of the given MIME type to text.
    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<String, LlmError>;
}
