//! # YouTube Module
//!
//! Fetches statistics and snippet text for one video from the YouTube
//! Data API v3 `videos` endpoint.
//!
//! A single GET per lookup: no retries, no pagination. The API reports
//! counters as decimal strings and omits hidden ones; omitted counters
//! become zero.

use crate::config::YouTubeConfig;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use watchskip_core::{VideoId, VideoMetadata, VideoStats};

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Failures while talking to the video metadata source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport, timeout or body decoding failure.
    #[error("YouTube API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("YouTube API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A counter was present but not a non-negative integer.
    #[error("invalid {field} in YouTube API response: {value:?}")]
    InvalidStatistic { field: &'static str, value: String },
}

// =============================================================================
// SOURCE TRAIT
// =============================================================================

/// Anything that can look up video metadata by ID.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// `Ok(None)` when the video does not exist.
    async fn fetch(&self, id: &VideoId) -> Result<Option<VideoMetadata>, FetchError>;
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

fn parse_count(field: &'static str, value: Option<&str>) -> Result<u64, FetchError> {
    match value {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| FetchError::InvalidStatistic {
                field,
                value: raw.to_owned(),
            }),
    }
}

impl Statistics {
    fn to_stats(&self) -> Result<VideoStats, FetchError> {
        Ok(VideoStats {
            views: parse_count("viewCount", self.view_count.as_deref())?,
            likes: parse_count("likeCount", self.like_count.as_deref())?,
            comments: parse_count("commentCount", self.comment_count.as_deref())?,
        })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for the YouTube Data API.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn fetch(&self, id: &VideoId) -> Result<Option<VideoMetadata>, FetchError> {
        let url = format!("{}/videos", self.base_url);
        debug!(video_id = %id, "fetching video statistics");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "statistics,snippet"),
                ("id", id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let list: VideoListResponse = response.json().await?;
        let Some(item) = list.items.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(VideoMetadata {
            id: id.clone(),
            title: item.snippet.title,
            description: item.snippet.description,
            stats: item.statistics.to_stats()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_defaults_missing_to_zero() {
        assert_eq!(parse_count("viewCount", None).ok(), Some(0));
        assert_eq!(parse_count("viewCount", Some("12345")).ok(), Some(12345));
    }

    #[test]
    fn parse_count_rejects_garbage() {
        let err = parse_count("likeCount", Some("lots"));
        assert!(matches!(
            err,
            Err(FetchError::InvalidStatistic { field: "likeCount", .. })
        ));
        assert!(parse_count("likeCount", Some("-3")).is_err());
    }

    #[test]
    fn wire_response_tolerates_missing_sections() {
        let list: VideoListResponse =
            serde_json::from_str(r#"{"items":[{"statistics":{"viewCount":"10"}}]}"#)
                .unwrap_or(VideoListResponse { items: Vec::new() });
        assert_eq!(list.items.len(), 1);
        let stats = list.items[0].statistics.to_stats().ok();
        assert_eq!(
            stats,
            Some(VideoStats {
                views: 10,
                likes: 0,
                comments: 0
            })
        );
        assert!(list.items[0].snippet.title.is_empty());
    }

    #[test]
    fn wire_response_without_items_is_empty() {
        let list: Result<VideoListResponse, _> = serde_json::from_str(r#"{"kind":"youtube#videoListResponse"}"#);
        assert!(list.is_ok_and(|l| l.items.is_empty()));
    }
}
