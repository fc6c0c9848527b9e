//! # Pipeline Module
//!
//! The fitted scaler + forest pair, its training metadata, and the
//! end-to-end training procedure:
//!
//! 1. stratified train/test split
//! 2. grid search with stratified k-fold CV on the training rows
//! 3. refit of the best parameters on all training rows
//! 4. evaluation on the held-out rows

use crate::dataset::Dataset;
use crate::features::{FEATURE_NAMES, FeatureVector};
use crate::forest::{RandomForest, RandomForestParams};
use crate::metrics::{ClassificationReport, ConfusionMatrix, accuracy};
use crate::scaler::StandardScaler;
use crate::selection::{
    CandidateScore, GridSearchResult, ParamGrid, StratifiedKFold, grid_search_with,
    train_test_split,
};
use crate::{Decision, Error, N_FEATURES, Result, Row};
use serde::{Deserialize, Serialize};

// =============================================================================
// PIPELINE
// =============================================================================

/// Standardize, then classify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    scaler: StandardScaler,
    forest: RandomForest,
}

impl Pipeline {
    /// Fit the scaler on `rows`, then the forest on the scaled rows.
    pub fn fit(rows: &[Row], labels: &[u8], params: RandomForestParams) -> Result<Self> {
        let scaler = StandardScaler::fit(rows)?;
        let scaled = scaler.transform(rows);
        let forest = RandomForest::fit(&scaled, labels, params)?;
        Ok(Self { scaler, forest })
    }

    /// Probability that the row is a "watch".
    #[must_use]
    pub fn predict_proba(&self, row: &Row) -> f64 {
        self.forest.predict_proba(&self.scaler.transform_row(row))
    }

    #[must_use]
    pub fn predict_class(&self, row: &Row) -> u8 {
        self.forest.predict(&self.scaler.transform_row(row))
    }

    #[must_use]
    pub fn predict_many(&self, rows: &[Row]) -> Vec<u8> {
        self.forest.predict_many(&self.scaler.transform(rows))
    }

    /// Decision for a derived feature vector.
    #[must_use]
    pub fn decide(&self, features: &FeatureVector) -> Decision {
        Decision::from_class(self.predict_class(&features.to_array()))
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn validate(&self) -> Result<()> {
        self.scaler.validate()?;
        self.forest.validate()
    }
}

// =============================================================================
// TRAINED MODEL
// =============================================================================

/// Facts recorded about a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub params: RandomForestParams,
    /// Mean k-fold accuracy of the chosen parameters.
    pub cv_accuracy: f64,
    /// Accuracy on the held-out test rows.
    pub test_accuracy: f64,
    pub feature_importances: [f64; N_FEATURES],
    pub train_samples: usize,
    pub test_samples: usize,
}

impl ModelMeta {
    /// Importances paired with their column names.
    #[must_use]
    pub fn named_importances(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.feature_importances)
            .collect()
    }
}

/// What gets saved to disk and loaded by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub pipeline: Pipeline,
    pub meta: ModelMeta,
}

impl TrainedModel {
    /// Structural check run on every decoded model file.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()
    }

    #[must_use]
    pub fn decide(&self, features: &FeatureVector) -> Decision {
        self.pipeline.decide(features)
    }
}

// =============================================================================
// TRAINING
// =============================================================================

/// Knobs for [`train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainOptions {
    pub test_fraction: f64,
    pub cv: StratifiedKFold,
    pub grid: ParamGrid,
    /// Seed for the split and for every forest.
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv: StratifiedKFold::default(),
            grid: ParamGrid::default(),
            seed: 42,
        }
    }
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub search: GridSearchResult,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
}

/// Run the full training procedure.
pub fn train(dataset: &Dataset, options: &TrainOptions) -> Result<TrainingOutcome> {
    train_with(dataset, options, |_, _| {})
}

/// [`train`] with a callback after each grid candidate is scored.
pub fn train_with(
    dataset: &Dataset,
    options: &TrainOptions,
    on_candidate: impl FnMut(usize, &CandidateScore),
) -> Result<TrainingOutcome> {
    if dataset.is_empty() {
        return Err(Error::InvalidDataset("dataset is empty".into()));
    }

    let split = train_test_split(&dataset.labels(), options.test_fraction, options.seed)?;
    let train_set = dataset.subset(&split.train);
    let test_set = dataset.subset(&split.test);

    let train_rows = train_set.features();
    let train_labels = train_set.labels();
    let test_rows = test_set.features();
    let test_labels = test_set.labels();

    let search = grid_search_with(
        &train_rows,
        &train_labels,
        &options.grid,
        &options.cv,
        options.seed,
        on_candidate,
    )?;
    let best = search
        .best()
        .ok_or_else(|| Error::InvalidParameter("grid search produced no candidates".into()))?;
    let params = best.params;
    let cv_accuracy = best.mean_accuracy;

    let pipeline = Pipeline::fit(&train_rows, &train_labels, params)?;
    let predicted = pipeline.predict_many(&test_rows);

    let meta = ModelMeta {
        params,
        cv_accuracy,
        test_accuracy: accuracy(&test_labels, &predicted),
        feature_importances: *pipeline.forest().feature_importances(),
        train_samples: train_rows.len(),
        test_samples: test_rows.len(),
    };

    Ok(TrainingOutcome {
        model: TrainedModel { pipeline, meta },
        report: ClassificationReport::from_predictions(&test_labels, &predicted),
        confusion: ConfusionMatrix::from_predictions(&test_labels, &predicted),
        search,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::VideoStats;

    fn quick_options() -> TrainOptions {
        TrainOptions {
            cv: StratifiedKFold {
                n_splits: 3,
                ..StratifiedKFold::default()
            },
            grid: ParamGrid {
                n_estimators: vec![10],
                max_depth: vec![Some(4), Some(8)],
                min_samples_leaf: vec![2],
            },
            ..TrainOptions::default()
        }
    }

    #[test]
    fn train_produces_consistent_meta() {
        let data = Dataset::generate(300, 42).unwrap();
        let outcome = train(&data, &quick_options()).unwrap();
        let meta = &outcome.model.meta;

        assert_eq!(meta.train_samples + meta.test_samples, 300);
        assert_eq!(meta.test_samples, 60);
        assert_eq!(outcome.search.candidates.len(), 2);
        assert!(meta.test_accuracy > 0.6, "test accuracy {}", meta.test_accuracy);
        assert!((meta.test_accuracy - outcome.report.accuracy).abs() < 1e-12);
        assert_eq!(outcome.confusion.total(), 60);
        assert_eq!(Some(meta.params), outcome.search.best().map(|b| b.params));
    }

    #[test]
    fn train_is_deterministic() {
        let data = Dataset::generate(200, 1).unwrap();
        let a = train(&data, &quick_options()).unwrap();
        let b = train(&data, &quick_options()).unwrap();
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn decide_maps_features_to_decision() {
        let data = Dataset::generate(300, 4).unwrap();
        let model = train(&data, &quick_options()).unwrap().model;

        // Strong engagement and positive text versus the opposite.
        let popular = FeatureVector::from_stats(
            VideoStats {
                views: 1_000_000,
                likes: 49_000,
                comments: 4_900,
            },
            0.95,
        );
        let ignored = FeatureVector::from_stats(
            VideoStats {
                views: 1_000,
                likes: 60,
                comments: 6,
            },
            -0.95,
        );
        assert_eq!(model.decide(&popular), Decision::Watch);
        assert_eq!(model.decide(&ignored), Decision::Skip);
    }

    #[test]
    fn named_importances_follow_columns() {
        let data = Dataset::generate(150, 4).unwrap();
        let model = train(&data, &quick_options()).unwrap().model;
        let named = model.meta.named_importances();
        assert_eq!(named.len(), N_FEATURES);
        assert_eq!(named[0].0, "log_views");
        assert_eq!(named[4].0, "sentiment");
    }

    #[test]
    fn train_rejects_empty_dataset() {
        assert!(train(&Dataset::default(), &quick_options()).is_err());
    }
}
