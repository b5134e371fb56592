//! YouTube oEmbed lookups for the video editor.
//!
//! Admins paste any common YouTube link; the id is pulled out locally and
//! the title, channel and thumbnail are fetched from the oEmbed endpoint.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::OEmbedConfig;

static YOUTUBE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|live/)|youtube-nocookie\.com/embed/|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/].*)?$",
    )
    .expect("Invalid YouTube URL regex")
});

/// The 11-character video id of a YouTube watch, share, embed or shorts URL.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    YOUTUBE_ID_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn youtube_thumbnail(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id)
}

pub fn youtube_embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

#[derive(Debug, Error)]
pub enum OEmbedError {
    #[error("Not a valid YouTube URL")]
    InvalidUrl,

    #[error("oEmbed request failed: {0}")]
    Upstream(String),
}

/// Subset of the oEmbed response the editor uses
#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// Video metadata returned to the admin UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoEmbed {
    pub video_id: String,
    pub title: String,
    pub author_name: String,
    pub thumbnail_url: String,
    pub embed_url: String,
}

pub struct OEmbedClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OEmbedClient {
    pub fn new(config: &OEmbedConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Minbar/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("HTTP client error: {}", e))?;

        Ok(Self {
            client,
            endpoint: config.youtube_endpoint.clone(),
        })
    }

    /// Validate `url` and look up its metadata. No retries.
    pub async fn youtube(&self, url: &str) -> Result<VideoEmbed, OEmbedError> {
        let video_id = extract_youtube_id(url).ok_or(OEmbedError::InvalidUrl)?;
        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .send()
            .await
            .map_err(|e| OEmbedError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OEmbedError::Upstream(format!(
                "YouTube responded with {}",
                response.status()
            )));
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| OEmbedError::Upstream(format!("Unreadable response: {}", e)))?;

        tracing::debug!("oEmbed lookup for {} succeeded", video_id);

        Ok(VideoEmbed {
            thumbnail_url: body
                .thumbnail_url
                .unwrap_or_else(|| youtube_thumbnail(&video_id)),
            embed_url: youtube_embed_url(&video_id),
            title: body.title,
            author_name: body.author_name,
            video_id,
        })
    }
}
