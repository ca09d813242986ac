//! Audio-only stream resolution and capped download.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use super::AcquisitionError;
use crate::http_client::{HttpError, WebFetcher};

/// Default download cap for audio streams.
pub const DEFAULT_AUDIO_CAP_BYTES: u64 = 100 * 1024 * 1024;

/// A downloadable audio-only stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub url: String,
    pub mime_type: String,
    /// Average bitrate in kbit/s.
    pub bitrate: f64,
    pub filesize: Option<u64>,
}

/// Resolves the best audio-only stream for a video.
#[async_trait]
pub trait AudioResolver: Send + Sync {
    async fn resolve(&self, source_url: &str) -> Result<AudioStream, AcquisitionError>;
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    url: Option<String>,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    abr: Option<f64>,
    tbr: Option<f64>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
}

fn audio_mime(ext: Option<&str>) -> String {
    match ext.unwrap_or("").to_lowercase().as_str() {
        "m4a" | "mp4" => "audio/mp4".to_string(),
        "webm" => "audio/webm".to_string(),
        "mp3" => "audio/mpeg".to_string(),
        "opus" | "ogg" => "audio/ogg".to_string(),
        other => mime_guess::from_ext(other)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::AUDIO)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "audio/mp4".to_string()),
    }
}

/// Highest-bitrate audio-only format from a yt-dlp format list.
fn best_audio_stream(formats: Vec<YtDlpFormat>) -> Option<AudioStream> {
    formats
        .into_iter()
        .filter(|f| f.vcodec.as_deref() == Some("none"))
        .filter(|f| f.acodec.as_deref() != Some("none"))
        .filter_map(|f| {
            let url = f.url?;
            Some(AudioStream {
                url,
                mime_type: audio_mime(f.ext.as_deref()),
                bitrate: f.abr.or(f.tbr).unwrap_or(0.0),
                filesize: f.filesize.or(f.filesize_approx),
            })
        })
        .max_by(|a, b| a.bitrate.total_cmp(&b.bitrate))
}

/// Resolver backed by `yt-dlp --dump-json`.
pub struct YtDlpResolver {
    binary: String,
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioResolver for YtDlpResolver {
    async fn resolve(&self, source_url: &str) -> Result<AudioStream, AcquisitionError> {
        if !self.is_available() {
            return Err(AcquisitionError::AudioUnavailable(format!(
                "{} not found in PATH",
                self.binary
            )));
        }

        let output = Command::new(&self.binary)
            .args(["--dump-json", "--no-playlist", "--skip-download"])
            .arg(source_url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AcquisitionError::AudioUnavailable(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url = source_url, "yt-dlp failed: {}", stderr.trim());
            return Err(AcquisitionError::AudioUnavailable(format!(
                "yt-dlp failed: {}",
                stderr.trim()
            )));
        }

        let info: YtDlpInfo = serde_json::from_slice(&output.stdout).map_err(|e| {
            AcquisitionError::AudioUnavailable(format!("Failed to parse yt-dlp JSON output: {}", e))
        })?;

        let stream = best_audio_stream(info.formats).ok_or_else(|| {
            AcquisitionError::AudioUnavailable("no audio-only formats".to_string())
        })?;
        debug!(bitrate = stream.bitrate, mime = %stream.mime_type, "audio stream resolved");
        Ok(stream)
    }
}

/// Download a stream, rejecting anything over `cap` bytes.
pub async fn download_capped(
    fetcher: &dyn WebFetcher,
    stream: &AudioStream,
    cap: u64,
) -> Result<Vec<u8>, AcquisitionError> {
    if let Some(size) = stream.filesize {
        if size > cap {
            return Err(AcquisitionError::Http(HttpError::TooLarge { limit: cap }));
        }
    }
    let bytes = fetcher.get_bytes(&stream.url, cap).await?;
    if bytes.is_empty() {
        return Err(AcquisitionError::AudioUnavailable(
            "audio download was empty".to_string(),
        ));
    }
    Ok(bytes)
}
