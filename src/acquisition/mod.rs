//! Content acquisition chain.
//!
//! Resolves a transcript for a content item through ordered stages:
//! caption API, legacy page scrape, audio download + transcription, and
//! finally a metadata fallback. Every stage either resolves or advances;
//! the chain always ends with some transcript text.

pub mod audio;
pub mod document;
pub mod fallback;
pub mod youtube;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::http_client::{HttpError, WebFetcher};
use crate::llm::{LlmError, ModelClient};
use crate::models::{ContentItem, ContentType};

pub use audio::{AudioResolver, AudioStream, YtDlpResolver, DEFAULT_AUDIO_CAP_BYTES};
pub use document::{Extracted, ExtractionError};
pub use fallback::{metadata_transcript, FALLBACK_NOTICE};
pub use youtube::{CaptionSource, TimedTextCaptions};

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("No captions available")]
    NoCaptions,
    #[error("Malformed source data: {0}")]
    Malformed(String),
    #[error("Audio unavailable: {0}")]
    AudioUnavailable(String),
    #[error("Not a recognizable video URL: {0}")]
    InvalidSource(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("Transcription failed: {0}")]
    Transcription(#[from] LlmError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Stage that produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Captions,
    Scrape,
    Audio,
    Document,
    Fallback,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Captions => "captions",
            Self::Scrape => "scrape",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub source: TranscriptSource,
}

impl Transcript {
    pub fn is_fallback(&self) -> bool {
        self.source == TranscriptSource::Fallback
    }
}

#[derive(Debug)]
enum State {
    NoTranscript,
    TryPrimary,
    TryLegacyScrape,
    TryAudioFallback,
    TryFileExtraction,
    MetadataFallback,
    Resolved(Transcript),
}

/// Knobs for the chain.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub caption_languages: Vec<String>,
    pub audio_cap_bytes: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            caption_languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
            audio_cap_bytes: DEFAULT_AUDIO_CAP_BYTES,
        }
    }
}

#[derive(Clone)]
pub struct TranscriptChain {
    captions: Arc<dyn CaptionSource>,
    fetcher: Arc<dyn WebFetcher>,
    audio: Arc<dyn AudioResolver>,
    model: ModelClient,
    config: AcquisitionConfig,
}

impl TranscriptChain {
    pub fn new(
        captions: Arc<dyn CaptionSource>,
        fetcher: Arc<dyn WebFetcher>,
        audio: Arc<dyn AudioResolver>,
        model: ModelClient,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            captions,
            fetcher,
            audio,
            model,
            config,
        }
    }

    /// Resolve a transcript for any content item. Never fails.
    pub async fn resolve(&self, item: &ContentItem) -> Transcript {
        let source_url = item.source_url.clone().unwrap_or_default();
        let video_id = youtube::video_id(&source_url);
        let mut state = State::NoTranscript;

        loop {
            state = match state {
                State::NoTranscript => match (item.content_type, &video_id) {
                    (ContentType::File, _) => State::TryFileExtraction,
                    (ContentType::Youtube, Some(_)) => State::TryPrimary,
                    (ContentType::Youtube, None) => {
                        warn!(content_id = %item.id, url = %source_url, "unrecognized video URL");
                        State::MetadataFallback
                    }
                },
                State::TryPrimary => {
                    let id = video_id.as_deref().unwrap_or_default();
                    let result = self
                        .captions
                        .fetch_captions(id, &self.config.caption_languages)
                        .await;
                    self.settle(item, result, TranscriptSource::Captions, State::TryLegacyScrape)
                }
                State::TryLegacyScrape => {
                    let id = video_id.as_deref().unwrap_or_default();
                    let result = youtube::scrape_captions(self.fetcher.as_ref(), id).await;
                    self.settle(item, result, TranscriptSource::Scrape, State::TryAudioFallback)
                }
                State::TryAudioFallback => {
                    let result = self.transcribe_audio(&source_url).await;
                    self.settle(item, result, TranscriptSource::Audio, State::MetadataFallback)
                }
                State::TryFileExtraction => match self.extract_file(item).await {
                    Ok((text, source)) => {
                        self.settle(item, Ok(text), source, State::MetadataFallback)
                    }
                    Err(e) => self.settle(
                        item,
                        Err(e),
                        TranscriptSource::Document,
                        State::MetadataFallback,
                    ),
                },
                State::MetadataFallback => State::Resolved(Transcript {
                    text: metadata_transcript(item),
                    source: TranscriptSource::Fallback,
                }),
                State::Resolved(transcript) => {
                    info!(
                        content_id = %item.id,
                        source = transcript.source.as_str(),
                        chars = transcript.text.len(),
                        "transcript resolved"
                    );
                    return transcript;
                }
            };
        }
    }

    /// Outcome of one stage: resolved with non-empty text, or advance.
    fn settle(
        &self,
        item: &ContentItem,
        result: Result<String, AcquisitionError>,
        source: TranscriptSource,
        next: State,
    ) -> State {
        match result {
            Ok(text) if !text.trim().is_empty() => State::Resolved(Transcript {
                text: text.trim().to_string(),
                source,
            }),
            Ok(_) => {
                debug!(content_id = %item.id, stage = source.as_str(), "stage returned empty text");
                next
            }
            Err(e) => {
                warn!(
                    content_id = %item.id,
                    stage = source.as_str(),
                    error = %e,
                    "acquisition stage failed"
                );
                next
            }
        }
    }

    async fn transcribe_audio(&self, source_url: &str) -> Result<String, AcquisitionError> {
        let stream = self.audio.resolve(source_url).await?;
        let bytes =
            audio::download_capped(self.fetcher.as_ref(), &stream, self.config.audio_cap_bytes)
                .await?;
        debug!(bytes = bytes.len(), mime = %stream.mime_type, "audio downloaded");
        Ok(self.model.transcribe(&bytes, &stream.mime_type).await?)
    }

    async fn extract_file(
        &self,
        item: &ContentItem,
    ) -> Result<(String, TranscriptSource), AcquisitionError> {
        let path = item.file_path.as_deref().ok_or_else(|| {
            AcquisitionError::InvalidSource("file item without a path".to_string())
        })?;
        match document::extract(Path::new(path), self.config.audio_cap_bytes).await? {
            Extracted::Text(text) => Ok((text, TranscriptSource::Document)),
            Extracted::Media { bytes, mime_type } => {
                let text = self.model.transcribe(&bytes, &mime_type).await?;
                Ok((text, TranscriptSource::Audio))
            }
        }
    }
}
