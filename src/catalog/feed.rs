//! Catalog feed loader
//!
//! Fetches the JSON video feed over HTTP (with retry on rate limiting) or
//! reads it from a local file.

use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Feed;

/// Feed loading error types
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid feed: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Could not read feed file: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client for the catalog feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl FeedClient {
    /// Create a client for the feed at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    /// Override the number of attempts made when rate limited
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download and parse the feed
    pub async fn fetch(&self) -> Result<Feed, FeedError> {
        let mut retries = 0;

        loop {
            debug!(url = %self.url, attempt = retries + 1, "fetching catalog feed");
            let response = self
                .client
                .get(&self.url)
                .header("Accept", "application/json")
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let feed: Feed = response.json().await.map_err(|e| {
                        if e.is_decode() {
                            FeedError::InvalidResponse(format!("JSON parse error: {}", e))
                        } else {
                            FeedError::RequestFailed(e)
                        }
                    })?;
                    info!(rows = feed.rows.len(), "catalog feed loaded");
                    return Ok(feed);
                }
                StatusCode::NOT_FOUND => {
                    return Err(FeedError::NotFound);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(FeedError::RateLimited);
                    }

                    // Get Retry-After header or default to exponential backoff
                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or_else(|| backoff_secs(retries));

                    warn!(wait_secs, "feed rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    continue;
                }
                status => {
                    return Err(FeedError::ServerError(status.as_u16()));
                }
            }
        }
    }

    /// Read a feed from a local file
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Feed, FeedError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading catalog feed file");
        let body = tokio::fs::read_to_string(path).await?;
        parse(&body)
    }

    /// Load from a URL or a file path, whichever `source` looks like
    pub async fn load(source: &str, max_retries: u32) -> Result<Feed, FeedError> {
        if is_url(source) {
            Self::new(source).with_max_retries(max_retries).fetch().await
        } else {
            Self::load_file(source).await
        }
    }
}

fn parse(body: &str) -> Result<Feed, FeedError> {
    serde_json::from_str(body).map_err(|e| FeedError::InvalidResponse(format!("JSON parse error: {}", e)))
}

/// Exponential backoff used when the server sends no Retry-After
fn backoff_secs(retries: u32) -> u64 {
    2u64.saturating_pow(retries)
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
