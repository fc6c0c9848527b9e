//! # Sentiment Module
//!
//! Compound polarity scoring of free text.
//!
//! The production scorer is VADER (`vader_sentiment`). Anything that maps
//! text to a score in [-1, 1] can stand in for it, including plain closures,
//! which keeps callers testable without the lexicon.

use std::fmt;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Maps text to a compound sentiment score in [-1, 1].
pub trait SentimentScorer: Send + Sync {
    /// Compound polarity of `text`. Neutral or empty text scores 0.0.
    fn compound(&self, text: &str) -> f64;
}

impl<F> SentimentScorer for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn compound(&self, text: &str) -> f64 {
        self(text)
    }
}

/// VADER lexicon scorer.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VaderScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaderScorer").finish_non_exhaustive()
    }
}

impl SentimentScorer for VaderScorer {
    fn compound(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let score = self
            .analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0);
        if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
