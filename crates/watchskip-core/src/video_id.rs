//! # Video ID Module
//!
//! Pulls the 11-character video ID out of a YouTube link.
//!
//! Recognized markers are the `v=` query parameter (`watch?v=ID`) and the
//! short-link path (`youtu.be/ID`). The first match anywhere in the input
//! wins; characters after the eleventh are ignored.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Length of every YouTube video ID.
pub const VIDEO_ID_LEN: usize = 11;

static VIDEO_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?:v=|be/)([A-Za-z0-9_-]{11})").expect("video id pattern compiles")
});

/// A validated YouTube video ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare video ID.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = id.len() == VIDEO_ID_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(id))
        } else {
            Err(Error::InvalidVideoId(id))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VideoId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

/// Extract the video ID from a YouTube URL.
///
/// Returns [`Error::InvalidUrl`] when no `v=` or `be/` marker is followed by
/// eleven ID characters.
pub fn extract_video_id(url: &str) -> Result<VideoId> {
    VIDEO_ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_owned()))
        .ok_or(Error::InvalidUrl)
}

// =============================================================================
// TESTS
// =============================================================================
