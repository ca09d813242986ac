//! YouTube caption stages: the timedtext caption API and the legacy
//! watch-page scrape.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::AcquisitionError;
use crate::http_client::WebFetcher;

const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";
const WATCH_URL: &str = "https://www.youtube.com/watch";

static CAPTION_TRACKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""captionTracks":\[\{"baseUrl":"([^"]+)""#).expect("valid regex")
});

static TRACKLIST_RENDERER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"playerCaptionsTracklistRenderer":\{.*?"baseUrl":"([^"]+)""#)
        .expect("valid regex")
});

static TEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("text").expect("valid selector"));
static PARAGRAPH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid selector"));
static TRACK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("track").expect("valid selector"));

/// Extract the 11-character video id from a YouTube URL.
pub fn video_id(source_url: &str) -> Option<String> {
    let url = Url::parse(source_url.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed") | Some("shorts") | Some("v") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(candidate)
}

/// Plain text from a timedtext caption document.
pub fn parse_caption_xml(xml: &str) -> String {
    let document = Html::parse_fragment(xml);
    let mut pieces: Vec<String> = document
        .select(&TEXT_SELECTOR)
        .map(|node| node.text().collect::<String>())
        .collect();
    if pieces.is_empty() {
        pieces = document
            .select(&PARAGRAPH_SELECTOR)
            .map(|node| node.text().collect::<String>())
            .collect();
    }

    let joined = pieces
        .iter()
        .map(|p| decode_entities(p))
        .collect::<Vec<_>>()
        .join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Caption payloads arrive double-escaped; undo the second layer.
fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Caption-track URL embedded in a watch page.
pub fn find_caption_url(page: &str) -> Option<String> {
    let document = Html::parse_document(page);
    let scripts: String = document
        .select(&SCRIPT_SELECTOR)
        .map(|s| s.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    let haystack = if scripts.is_empty() { page } else { scripts.as_str() };

    let raw = CAPTION_TRACKS
        .captures(haystack)
        .or_else(|| TRACKLIST_RENDERER.captures(haystack))?
        .get(1)?
        .as_str();

    // The URL is a JSON string literal (&, \/ escapes).
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).ok()
}

/// Primary caption lookup.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Caption text for the video, trying `languages` in order, then any
    /// available language.
    async fn fetch_captions(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<String, AcquisitionError>;
}

/// YouTube timedtext API.
pub struct TimedTextCaptions {
    fetcher: Arc<dyn WebFetcher>,
}

impl TimedTextCaptions {
    pub fn new(fetcher: Arc<dyn WebFetcher>) -> Self {
        Self { fetcher }
    }

    fn track_url(video_id: &str, lang: &str) -> Result<Url, AcquisitionError> {
        Url::parse_with_params(TIMEDTEXT_URL, &[("lang", lang), ("v", video_id)])
            .map_err(|e| AcquisitionError::Malformed(e.to_string()))
    }

    async fn fetch_track(&self, video_id: &str, lang: &str) -> Result<String, AcquisitionError> {
        let url = Self::track_url(video_id, lang)?;
        let xml = self.fetcher.get_text(url.as_str()).await?;
        Ok(parse_caption_xml(&xml))
    }

    async fn listed_languages(&self, video_id: &str) -> Result<Vec<String>, AcquisitionError> {
        let url = Url::parse_with_params(TIMEDTEXT_URL, &[("type", "list"), ("v", video_id)])
            .map_err(|e| AcquisitionError::Malformed(e.to_string()))?;
        let xml = self.fetcher.get_text(url.as_str()).await?;
        let document = Html::parse_fragment(&xml);
        Ok(document
            .select(&TRACK_SELECTOR)
            .filter_map(|t| t.value().attr("lang_code").map(str::to_string))
            .collect())
    }
}

#[async_trait]
impl CaptionSource for TimedTextCaptions {
    async fn fetch_captions(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<String, AcquisitionError> {
        for lang in languages {
            match self.fetch_track(video_id, lang).await {
                Ok(text) if !text.is_empty() => return Ok(text),
                Ok(_) => debug!(video_id, lang = %lang, "no captions in preferred language"),
                Err(e) => debug!(video_id, lang = %lang, error = %e, "caption request failed"),
            }
        }

        for lang in self.listed_languages(video_id).await? {
            if languages.contains(&lang) {
                continue;
            }
            let text = self.fetch_track(video_id, &lang).await?;
            if !text.is_empty() {
                debug!(video_id, lang = %lang, "using captions in non-preferred language");
                return Ok(text);
            }
        }

        Err(AcquisitionError::NoCaptions)
    }
}

/// Scrape the watch page for a caption-track URL and fetch it.
pub async fn scrape_captions(
    fetcher: &dyn WebFetcher,
    video_id: &str,
) -> Result<String, AcquisitionError> {
    let page_url = Url::parse_with_params(WATCH_URL, &[("v", video_id)])
        .map_err(|e| AcquisitionError::Malformed(e.to_string()))?;
    let page = fetcher.get_text(page_url.as_str()).await?;

    let caption_url = find_caption_url(&page).ok_or_else(|| {
        AcquisitionError::Malformed("no caption track URL in watch page".to_string())
    })?;
    let xml = fetcher.get_text(&caption_url).await?;

    let text = parse_caption_xml(&xml);
    if text.is_empty() {
        return Err(AcquisitionError::NoCaptions);
    }
    Ok(text)
}
