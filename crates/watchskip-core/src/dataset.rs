//! # Dataset Module
//!
//! Synthetic training data and its CSV representation.
//!
//! The generator draws each feature column independently and labels a row
//! "watch" when a noisy weighted score of likes, sentiment, comments and
//! like-ratio exceeds 0.45. The data carries no real-world signal; it exists
//! to give the classifier something to learn.

use crate::{Error, N_FEATURES, Result, Row, SKIP, WATCH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// GENERATOR CONFIGURATION
// =============================================================================

/// Default number of generated rows.
pub const DEFAULT_SAMPLES: usize = 2000;

/// Default generator seed.
pub const DEFAULT_SEED: u64 = 42;

/// Score above which a generated row is labelled "watch".
pub const WATCH_THRESHOLD: f64 = 0.45;

const LOG_VIEWS_RANGE: std::ops::Range<f64> = 6.0..18.0;
const LIKES_RANGE: std::ops::Range<u64> = 50..50_000;
const COMMENTS_RANGE: std::ops::Range<u64> = 5..5_000;
const LIKE_RATIO_MEAN: f64 = 0.05;
const LIKE_RATIO_STD: f64 = 0.03;
const LIKE_RATIO_MIN: f64 = 0.001;
const LIKE_RATIO_MAX: f64 = 0.15;
const LABEL_NOISE_STD: f64 = 0.08;

const LIKES_WEIGHT: f64 = 0.35;
const SENTIMENT_WEIGHT: f64 = 0.25;
const COMMENTS_WEIGHT: f64 = 0.2;
const LIKE_RATIO_WEIGHT: f64 = 0.1;

// =============================================================================
// SAMPLE
// =============================================================================

/// One CSV record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub log_views: f64,
    pub likes: u64,
    pub comment_count: u64,
    pub like_ratio: f64,
    pub sentiment: f64,
    pub label: u8,
}

impl Sample {
    /// Features in column order.
    #[must_use]
    pub fn row(&self) -> Row {
        [
            self.log_views,
            self.likes as f64,
            self.comment_count as f64,
            self.like_ratio,
            self.sentiment,
        ]
    }
}

/// Fraction of rows in each class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelBalance {
    pub skip: f64,
    pub watch: f64,
}

// =============================================================================
// DATASET
// =============================================================================

/// A labelled feature table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Build a dataset from records, validating each one.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        for (line, sample) in samples.iter().enumerate() {
            validate(sample, line)?;
        }
        Ok(Self { samples })
    }

    /// Generate `n` synthetic rows, deterministically for a given seed.
    pub fn generate(n: usize, seed: u64) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidParameter(
                "sample count must be positive".into(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let ratio_dist = Normal::new(LIKE_RATIO_MEAN, LIKE_RATIO_STD)
            .map_err(|e| Error::InvalidParameter(e.to_string()))?;
        let noise_dist = Normal::new(0.0, LABEL_NOISE_STD)
            .map_err(|e| Error::InvalidParameter(e.to_string()))?;

        // Columns are drawn one after another so each stream stays stable
        // when another column's distribution changes.
        let log_views: Vec<f64> = (0..n).map(|_| rng.gen_range(LOG_VIEWS_RANGE)).collect();
        let likes: Vec<u64> = (0..n).map(|_| rng.gen_range(LIKES_RANGE)).collect();
        let comments: Vec<u64> = (0..n).map(|_| rng.gen_range(COMMENTS_RANGE)).collect();
        let like_ratio: Vec<f64> = (0..n)
            .map(|_| ratio_dist.sample(&mut rng).clamp(LIKE_RATIO_MIN, LIKE_RATIO_MAX))
            .collect();
        let sentiment: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let noise: Vec<f64> = (0..n).map(|_| noise_dist.sample(&mut rng)).collect();

        let likes_max = likes.iter().copied().max().unwrap_or(0) as f64;
        let comments_log_max = comments
            .iter()
            .map(|&c| (c as f64).ln_1p())
            .fold(f64::MIN_POSITIVE, f64::max);
        let ratio_max = like_ratio.iter().copied().fold(f64::MIN_POSITIVE, f64::max);

        let samples = (0..n)
            .map(|i| {
                let score = LIKES_WEIGHT * (likes[i] as f64 / (likes_max + 1.0))
                    + SENTIMENT_WEIGHT * ((sentiment[i] + 1.0) / 2.0).clamp(0.0, 1.0)
                    + COMMENTS_WEIGHT * (comments[i] as f64).ln_1p() / comments_log_max
                    + LIKE_RATIO_WEIGHT * (like_ratio[i] / ratio_max)
                    + noise[i];
                Sample {
                    log_views: log_views[i],
                    likes: likes[i],
                    comment_count: comments[i],
                    like_ratio: like_ratio[i],
                    sentiment: sentiment[i],
                    label: if score > WATCH_THRESHOLD { WATCH } else { SKIP },
                }
            })
            .collect();

        Ok(Self { samples })
    }

    /// Read a dataset from CSV with a `log_views,likes,comment_count,like_ratio,sentiment,label` header.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let samples = reader
            .deserialize::<Sample>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if samples.is_empty() {
            return Err(Error::InvalidDataset(format!(
                "{} contains no rows",
                path.display()
            )));
        }
        Self::from_samples(samples)
    }

    /// Write the dataset as CSV, creating parent directories.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for sample in &self.samples {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Feature rows in record order.
    #[must_use]
    pub fn features(&self) -> Vec<Row> {
        self.samples.iter().map(Sample::row).collect()
    }

    /// Labels in record order.
    #[must_use]
    pub fn labels(&self) -> Vec<u8> {
        self.samples.iter().map(|s| s.label).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of columns including the label.
    #[must_use]
    pub fn width(&self) -> usize {
        N_FEATURES + 1
    }

    /// Rows at the given indices. Out-of-range indices are skipped.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            samples: indices
                .iter()
                .filter_map(|&i| self.samples.get(i).copied())
                .collect(),
        }
    }

    /// Fraction of rows per class. Both fractions are zero for an empty dataset.
    #[must_use]
    pub fn label_balance(&self) -> LabelBalance {
        if self.samples.is_empty() {
            return LabelBalance {
                skip: 0.0,
                watch: 0.0,
            };
        }
        let watch = self.samples.iter().filter(|s| s.label == WATCH).count() as f64;
        let total = self.samples.len() as f64;
        LabelBalance {
            skip: (total - watch) / total,
            watch: watch / total,
        }
    }
}

fn validate(sample: &Sample, line: usize) -> Result<()> {
    if sample.label != WATCH && sample.label != SKIP {
        return Err(Error::InvalidDataset(format!(
            "row {}: label must be 0 or 1, got {}",
            line + 1,
            sample.label
        )));
    }
    if !sample.row().iter().all(|v| v.is_finite()) {
        return Err(Error::InvalidDataset(format!(
            "row {}: features must be finite",
            line + 1
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
