//! HTTP fetching for the scrape and download stages.
//!
//! Stages talk to the network through [`WebFetcher`] so they can be driven
//! by scripted fetchers in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Browser user agent; caption endpoints serve reduced pages to unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Body exceeds {limit} byte limit")]
    TooLarge { limit: u64 },
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        HttpError::Request(e.to_string())
    }
}

#[async_trait]
pub trait WebFetcher: Send + Sync {
    /// GET `url` and return the body as text.
    async fn get_text(&self, url: &str) -> Result<String, HttpError>;

    /// GET `url` and return the body, rejecting bodies over `max_bytes`.
    async fn get_bytes(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>, HttpError>;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, HttpError> {
        let response = self
            .client
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl WebFetcher for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let response = self.send(url).await?;
        Ok(response.text().await?)
    }

    async fn get_bytes(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>, HttpError> {
        let mut response = self.send(url).await?;

        if let Some(length) = response.content_length() {
            if length > max_bytes {
                debug!(url, length, max_bytes, "rejecting oversized body up front");
                return Err(HttpError::TooLarge { limit: max_bytes });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(HttpError::TooLarge { limit: max_bytes });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}
