//! Model client holding a rate slot for every external call.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::prompts::{flashcard_prompt, quiz_prompt, restructure_prompt, summary_prompt};
use super::response::{missing_sections, parse_items, strip_code_fences, RawCard, RawQuestion};
use super::validate::{validate_cards, validate_questions};
use super::{GenerativeModel, LlmError};
use crate::models::{
    Flashcard, FlashcardOptions, Question, QuizOptions, SummaryFormat, SummaryOptions,
};
use crate::rate_limit::RateSlots;

/// Generative model behind a shared pool of rate slots.
#[derive(Clone)]
pub struct ModelClient {
    model: Arc<dyn GenerativeModel>,
    slots: RateSlots,
}

impl ModelClient {
    pub fn new(model: Arc<dyn GenerativeModel>, slots: RateSlots) -> Self {
        Self { model, slots }
    }

    pub fn slots(&self) -> &RateSlots {
        &self.slots
    }

    /// Generate a summary of `source`.
    ///
    /// For the sectioned format, a reply missing any required section gets
    /// exactly one restructuring re-prompt within the same slot.
    pub async fn generate_summary(
        &self,
        source: &str,
        title: &str,
        options: &SummaryOptions,
    ) -> Result<String, LlmError> {
        let _slot = self.slots.acquire().await?;

        let reply = self.model.generate(&summary_prompt(source, title, options)).await?;
        let summary = strip_code_fences(&reply).to_string();
        if summary.is_empty() {
            return Err(LlmError::Validation("model returned an empty summary".to_string()));
        }

        if options.format != SummaryFormat::Sectioned {
            return Ok(summary);
        }
        let missing = missing_sections(&summary);
        if missing.is_empty() {
            return Ok(summary);
        }

        info!(?missing, "Summary missing sections, requesting restructure");
        match self.model.generate(&restructure_prompt(&summary)).await {
            Ok(reply) => {
                let restructured = strip_code_fences(&reply).to_string();
                if restructured.is_empty() {
                    warn!("Restructure returned nothing, keeping original summary");
                    return Ok(summary);
                }
                let still_missing = missing_sections(&restructured);
                if !still_missing.is_empty() {
                    warn!(missing = ?still_missing, "Restructured summary still missing sections");
                }
                Ok(restructured)
            }
            Err(e) => {
                warn!(error = %e, "Restructure call failed, keeping original summary");
                Ok(summary)
            }
        }
    }

    /// Generate and validate quiz questions over `source`.
    pub async fn generate_quiz(
        &self,
        source: &str,
        options: &QuizOptions,
    ) -> Result<Vec<Question>, LlmError> {
        let _slot = self.slots.acquire().await?;
        let reply = self.model.generate(&quiz_prompt(source, options)).await?;
        let raw: Vec<RawQuestion> = parse_items(&reply)?;
        debug!(items = raw.len(), "quiz reply parsed");
        validate_questions(raw, options)
    }

    /// Generate and validate flashcards over `source`.
    pub async fn generate_flashcards(
        &self,
        source: &str,
        options: &FlashcardOptions,
    ) -> Result<Vec<Flashcard>, LlmError> {
        let _slot = self.slots.acquire().await?;
        let reply = self.model.generate(&flashcard_prompt(source, options)).await?;
        let raw: Vec<RawCard> = parse_items(&reply)?;
        debug!(items = raw.len(), "flashcard reply parsed");
        validate_cards(raw, options)
    }

    /// Transcribe audio/video bytes.
    pub async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<String, LlmError> {
        let _slot = self.slots.acquire().await?;
        let text = self.model.transcribe(media, mime_type).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::Validation("transcription came back empty".to_string()));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order and records prompts.
    #[derive(Default)]
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::default(),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Connection("script exhausted".into())))
        }

        async fn transcribe(&self, _media: &[u8], _mime_type: &str) -> Result<String, LlmError> {
            self.generate("transcribe").await
        }
    }

    fn client(model: Arc<ScriptedModel>) -> ModelClient {
        ModelClient::new(model, RateSlots::new(1))
    }

    #[tokio::test]
    async fn test_complete_summary_needs_no_restructure() {
        let model = ScriptedModel::new(vec![Ok(
            "OVERVIEW\nx\nKEY POINTS\ny\nTAKEAWAYS\nz".to_string()
        )]);
        let summary = client(model.clone())
            .generate_summary("src", "T", &SummaryOptions::default())
            .await
            .unwrap();
        assert!(summary.starts_with("OVERVIEW"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_summary_restructured_at_most_once() {
        let model = ScriptedModel::new(vec![
            Ok("A summary with no sections".to_string()),
            Ok("OVERVIEW\nonly overview".to_string()),
            Ok("never requested".to_string()),
        ]);
        let summary = client(model.clone())
            .generate_summary("src", "T", &SummaryOptions::default())
            .await
            .unwrap();
        assert_eq!(summary, "OVERVIEW\nonly overview");
        assert_eq!(model.calls(), 2);
        assert!(model.prompts.lock().unwrap()[1].contains("A summary with no sections"));
    }

    #[tokio::test]
    async fn test_prose_summary_is_not_restructured() {
        let model = ScriptedModel::new(vec![Ok("Flowing prose.".to_string())]);
        let options = SummaryOptions {
            format: SummaryFormat::Prose,
            ..SummaryOptions::default()
        };
        client(model.clone())
            .generate_summary("src", "T", &options)
            .await
            .unwrap();
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_slot_released_after_model_error() {
        let model = ScriptedModel::new(vec![
            Err(LlmError::Connection("reset".into())),
            Ok(r#"[{"front": "a", "back": "b"}]"#.to_string()),
        ]);
        let client = client(model);

        let err = client
            .generate_quiz("src", &QuizOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(client.slots().in_flight(), 0);

        let cards = client
            .generate_flashcards("src", &FlashcardOptions::default())
            .await
            .unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(client.slots().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_quiz_is_validation_failure() {
        let model = ScriptedModel::new(vec![Ok("no json here".to_string())]);
        let err = client(model)
            .generate_quiz("src", &QuizOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_empty_transcription_is_an_error() {
        let model = ScriptedModel::new(vec![Ok("   ".to_string())]);
        let err = client(model)
            .transcribe(b"bytes", "audio/webm")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }
}
