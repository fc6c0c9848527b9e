//! # WatchSkip Core
//!
//! The prediction engine behind WatchSkip.
//!
//! A video is reduced to a fixed five-column feature vector
//! (log-views, likes, comments, like-ratio, sentiment) which a
//! scaler + random forest pipeline turns into a Watch/Skip decision.
//!
//! This crate has no async runtime and no network access. Fetching
//! statistics from YouTube and serving predictions over HTTP live in
//! the `watchskip` binary crate.

pub mod dataset;
pub mod features;
pub mod forest;
pub mod formats;
pub mod metrics;
pub mod pipeline;
pub mod scaler;
pub mod selection;
pub mod sentiment;
pub mod tree;
pub mod video_id;

mod error;

pub use dataset::{Dataset, LabelBalance, Sample};
pub use error::{Error, Result};
pub use features::{FEATURE_NAMES, FeatureVector, VideoMetadata, VideoStats};
pub use forest::{RandomForest, RandomForestParams};
pub use pipeline::{ModelMeta, Pipeline, TrainOptions, TrainedModel, TrainingOutcome};
pub use sentiment::{SentimentScorer, VaderScorer};
pub use video_id::{VideoId, extract_video_id};

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// FEATURE LAYOUT
// =============================================================================

/// Number of feature columns the classifier consumes.
pub const N_FEATURES: usize = 5;

/// One feature row in column order (see [`FEATURE_NAMES`]).
pub type Row = [f64; N_FEATURES];

/// Class label for "watch".
pub const WATCH: u8 = 1;

/// Class label for "skip".
pub const SKIP: u8 = 0;

// =============================================================================
// DECISION
// =============================================================================

/// The binary outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Watch,
    Skip,
}

impl Decision {
    /// Map a class label to a decision. Class 1 is Watch, anything else Skip.
    #[must_use]
    pub fn from_class(class: u8) -> Self {
        if class == WATCH { Self::Watch } else { Self::Skip }
    }

    /// The class label for this decision.
    #[must_use]
    pub fn class(self) -> u8 {
        match self {
            Self::Watch => WATCH,
            Self::Skip => SKIP,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watch => f.write_str("Watch"),
            Self::Skip => f.write_str("Skip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_from_class() {
        assert_eq!(Decision::from_class(1), Decision::Watch);
        assert_eq!(Decision::from_class(0), Decision::Skip);
        assert_eq!(Decision::from_class(7), Decision::Skip);
    }

    #[test]
    fn decision_serializes_as_plain_name() {
        assert_eq!(
            serde_json::to_string(&Decision::Watch).ok().as_deref(),
            Some("\"Watch\"")
        );
    }
}
