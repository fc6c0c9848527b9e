//! # Features Module
//!
//! Turns raw video metadata into the five-column feature vector the
//! classifier was trained on.
//!
//! | column        | value                      |
//! |---------------|----------------------------|
//! | log_views     | `ln(1 + views)`            |
//! | likes         | like count                 |
//! | comment_count | comment count              |
//! | like_ratio    | `likes / (views + 1)`      |
//! | sentiment     | compound score of the text |

use crate::sentiment::SentimentScorer;
use crate::video_id::VideoId;
use crate::{N_FEATURES, Row};
use serde::{Deserialize, Serialize};

/// Column names in feature order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "log_views",
    "likes",
    "comment_count",
    "like_ratio",
    "sentiment",
];

/// Engagement counters of a video. Hidden counters are reported as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStats {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

/// Everything the predictor needs to know about one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: VideoId,
    pub title: String,
    pub description: String,
    pub stats: VideoStats,
}

impl VideoMetadata {
    /// Text fed to the sentiment scorer: title and description joined by a space.
    #[must_use]
    pub fn sentiment_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// The derived feature vector.
///
/// Field names match the JSON returned by the prediction endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub log_views: f64,
    pub likes: u64,
    pub comments: u64,
    pub like_ratio: f64,
    pub sentiment: f64,
}

impl FeatureVector {
    /// Compute features from counters and an already scored sentiment.
    #[must_use]
    pub fn from_stats(stats: VideoStats, sentiment: f64) -> Self {
        let views = stats.views as f64;
        Self {
            log_views: views.ln_1p(),
            likes: stats.likes,
            comments: stats.comments,
            like_ratio: stats.likes as f64 / (views + 1.0),
            sentiment,
        }
    }

    /// Score the metadata text and compute features.
    pub fn derive(metadata: &VideoMetadata, scorer: &dyn SentimentScorer) -> Self {
        let sentiment = scorer.compound(&metadata.sentiment_text());
        Self::from_stats(metadata.stats, sentiment)
    }

    /// The feature row in column order.
    #[must_use]
    pub fn to_array(&self) -> Row {
        [
            self.log_views,
            self.likes as f64,
            self.comments as f64,
            self.like_ratio,
            self.sentiment,
        ]
    }
}

// =============================================================================
// TESTS
// =============================================================================
