//! # Model Selection
//!
//! Stratified train/test splitting, stratified k-fold cross-validation and
//! an exhaustive hyperparameter grid search over the scaler + forest
//! pipeline.
//!
//! Grid candidates are enumerated with `max_depth` outermost and
//! `n_estimators` innermost. Ties in mean accuracy go to the earlier
//! candidate.

use crate::forest::RandomForestParams;
use crate::metrics::accuracy;
use crate::pipeline::Pipeline;
use crate::{Error, Result, Row};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SPLITS
// =============================================================================

/// Index sets for one train/validation partition. Both sides are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Group row indices by label, in ascending label order.
fn indices_by_class(labels: &[u8]) -> BTreeMap<u8, Vec<usize>> {
    let mut classes: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        classes.entry(label).or_default().push(i);
    }
    classes
}

/// Stratified shuffle split.
///
/// Each class contributes `round(count * test_fraction)` rows to the test
/// side, so class proportions are preserved on both sides.
pub fn train_test_split(labels: &[u8], test_fraction: f64, seed: u64) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::InvalidParameter(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut members) in indices_by_class(labels) {
        members.shuffle(&mut rng);
        let n_test = (members.len() as f64 * test_fraction).round() as usize;
        let (t, rest) = members.split_at(n_test.min(members.len()));
        test.extend_from_slice(t);
        train.extend_from_slice(rest);
    }

    if train.is_empty() || test.is_empty() {
        return Err(Error::InvalidParameter(format!(
            "{} rows cannot be split with test fraction {test_fraction}",
            labels.len()
        )));
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

/// Stratified k-fold cross-validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self {
            n_splits: 5,
            shuffle: true,
            seed: 42,
        }
    }
}

impl StratifiedKFold {
    /// Partition rows into `n_splits` folds with matching class proportions.
    ///
    /// Each class is (optionally) shuffled and dealt round-robin into the
    /// folds, continuing where the previous class stopped so fold sizes
    /// differ by at most one.
    pub fn split(&self, labels: &[u8]) -> Result<Vec<Split>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(Error::InvalidParameter(format!(
                "n_splits must be at least 2, got {k}"
            )));
        }

        let classes = indices_by_class(labels);
        if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < k) {
            return Err(Error::InvalidParameter(format!(
                "class {label} has {} members, fewer than n_splits={k}",
                members.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold_of = vec![0usize; labels.len()];
        let mut offset = 0;
        for (_, mut members) in classes {
            if self.shuffle {
                members.shuffle(&mut rng);
            }
            for (pos, &idx) in members.iter().enumerate() {
                fold_of[idx] = (offset + pos) % k;
            }
            offset = (offset + members.len()) % k;
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| fold_of[i] == fold);
                Split { train, test }
            })
            .collect())
    }
}

// =============================================================================
// PARAMETER GRID
// =============================================================================

/// Hyperparameter values to try; candidates are their cartesian product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200],
            max_depth: vec![Some(6), Some(10), None],
            min_samples_leaf: vec![2, 4],
        }
    }
}

impl ParamGrid {
    /// All candidate parameter sets, sharing one forest seed.
    #[must_use]
    pub fn candidates(&self, seed: u64) -> Vec<RandomForestParams> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &min_samples_leaf in &self.min_samples_leaf {
                for &n_estimators in &self.n_estimators {
                    out.push(RandomForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_leaf,
                        seed,
                    });
                }
            }
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len() * self.min_samples_leaf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// GRID SEARCH
// =============================================================================

/// Cross-validation result for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: RandomForestParams,
    pub fold_scores: Vec<f64>,
    pub mean_accuracy: f64,
    pub std_accuracy: f64,
}

impl CandidateScore {
    fn new(params: RandomForestParams, fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len().max(1) as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let var = fold_scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
        Self {
            params,
            fold_scores,
            mean_accuracy: mean,
            std_accuracy: var.sqrt(),
        }
    }
}

/// Outcome of a grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    /// Scores in grid order.
    pub candidates: Vec<CandidateScore>,
    /// Position of the winner in `candidates`.
    pub best_index: usize,
}

impl GridSearchResult {
    #[must_use]
    pub fn best(&self) -> Option<&CandidateScore> {
        self.candidates.get(self.best_index)
    }
}

/// Score every grid candidate by k-fold accuracy.
pub fn grid_search(
    rows: &[Row],
    labels: &[u8],
    grid: &ParamGrid,
    cv: &StratifiedKFold,
    seed: u64,
) -> Result<GridSearchResult> {
    grid_search_with(rows, labels, grid, cv, seed, |_, _| {})
}

/// [`grid_search`] with a callback after each candidate (`index`, score).
pub fn grid_search_with(
    rows: &[Row],
    labels: &[u8],
    grid: &ParamGrid,
    cv: &StratifiedKFold,
    seed: u64,
    mut on_candidate: impl FnMut(usize, &CandidateScore),
) -> Result<GridSearchResult> {
    if grid.is_empty() {
        return Err(Error::InvalidParameter("parameter grid is empty".into()));
    }
    if rows.len() != labels.len() {
        return Err(Error::InvalidParameter(format!(
            "{} rows but {} labels",
            rows.len(),
            labels.len()
        )));
    }

    let folds = cv.split(labels)?;
    let mut candidates = Vec::with_capacity(grid.len());
    let mut best_index = 0;

    for (index, params) in grid.candidates(seed).into_iter().enumerate() {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for fold in &folds {
            let train_rows: Vec<Row> = fold.train.iter().map(|&i| rows[i]).collect();
            let train_labels: Vec<u8> = fold.train.iter().map(|&i| labels[i]).collect();
            let pipeline = Pipeline::fit(&train_rows, &train_labels, params)?;

            let test_rows: Vec<Row> = fold.test.iter().map(|&i| rows[i]).collect();
            let truth: Vec<u8> = fold.test.iter().map(|&i| labels[i]).collect();
            let predicted = pipeline.predict_many(&test_rows);
            fold_scores.push(accuracy(&truth, &predicted));
        }

        let score = CandidateScore::new(params, fold_scores);
        on_candidate(index, &score);
        if candidates
            .get(best_index)
            .is_some_and(|best: &CandidateScore| score.mean_accuracy > best.mean_accuracy)
        {
            best_index = index;
        }
        candidates.push(score);
    }

    Ok(GridSearchResult {
        candidates,
        best_index,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Dataset;
    use std::collections::BTreeSet;

    fn labels(n_pos: usize, n_neg: usize) -> Vec<u8> {
        let mut v = vec![1u8; n_pos];
        v.extend(vec![0u8; n_neg]);
        v
    }

    #[test]
    fn train_test_split_is_stratified_and_exhaustive() {
        let y = labels(60, 40);
        let split = train_test_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let pos_in_test = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(pos_in_test, 12);

        let all: BTreeSet<usize> = split.train.iter().chain(&split.test).copied().collect();
        assert_eq!(all.len(), 100);
    }

    #[test]
    fn train_test_split_is_deterministic() {
        let y = labels(30, 30);
        assert_eq!(
            train_test_split(&y, 0.25, 1).unwrap(),
            train_test_split(&y, 0.25, 1).unwrap()
        );
    }

    #[test]
    fn train_test_split_rejects_bad_fraction() {
        let y = labels(5, 5);
        assert!(train_test_split(&y, 0.0, 1).is_err());
        assert!(train_test_split(&y, 1.0, 1).is_err());
        assert!(train_test_split(&y, f64::NAN, 1).is_err());
        assert!(train_test_split(&[1], 0.2, 1).is_err());
    }

    #[test]
    fn kfold_partitions_every_row_once() {
        let y = labels(23, 17);
        let folds = StratifiedKFold::default().split(&y).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0usize; y.len()];
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), y.len());
            for &i in &fold.test {
                seen[i] += 1;
            }
            assert!(fold.test.len() == 8);
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn kfold_keeps_class_proportions() {
        let y = labels(50, 25);
        let folds = StratifiedKFold::default().split(&y).unwrap();
        for fold in folds {
            let pos = fold.test.iter().filter(|&&i| y[i] == 1).count();
            assert_eq!(pos, 10);
            assert_eq!(fold.test.len(), 15);
        }
    }

    #[test]
    fn kfold_rejects_small_classes() {
        let y = labels(10, 3);
        assert!(StratifiedKFold::default().split(&y).is_err());
        let one = StratifiedKFold {
            n_splits: 1,
            ..StratifiedKFold::default()
        };
        assert!(one.split(&labels(10, 10)).is_err());
    }

    #[test]
    fn default_grid_has_twelve_candidates() {
        let grid = ParamGrid::default();
        let candidates = grid.candidates(42);
        assert_eq!(candidates.len(), 12);
        assert_eq!(grid.len(), 12);
        assert_eq!(candidates[0].max_depth, Some(6));
        assert_eq!(candidates[0].n_estimators, 100);
        assert_eq!(candidates[1].n_estimators, 200);
        assert_eq!(candidates[11].max_depth, None);
        assert_eq!(candidates[11].min_samples_leaf, 4);
    }

    #[test]
    fn grid_search_scores_each_candidate() {
        let data = Dataset::generate(200, 3).unwrap();
        let grid = ParamGrid {
            n_estimators: vec![5, 10],
            max_depth: vec![Some(1), Some(6)],
            min_samples_leaf: vec![2],
        };
        let cv = StratifiedKFold {
            n_splits: 3,
            ..StratifiedKFold::default()
        };

        let mut calls = 0;
        let result = grid_search_with(
            &data.features(),
            &data.labels(),
            &grid,
            &cv,
            42,
            |_, _| calls += 1,
        )
        .unwrap();

        assert_eq!(calls, 4);
        assert_eq!(result.candidates.len(), 4);
        let best = result.best().unwrap();
        for c in &result.candidates {
            assert_eq!(c.fold_scores.len(), 3);
            assert!(c.mean_accuracy <= best.mean_accuracy);
        }
    }

    #[test]
    fn grid_search_ties_go_to_first_candidate() {
        let data = Dataset::generate(150, 8).unwrap();
        let grid = ParamGrid {
            n_estimators: vec![5, 5],
            max_depth: vec![Some(3)],
            min_samples_leaf: vec![2],
        };
        let cv = StratifiedKFold {
            n_splits: 3,
            ..StratifiedKFold::default()
        };

        let result = grid_search(&data.features(), &data.labels(), &grid, &cv, 42).unwrap();

        assert_eq!(result.candidates.len(), 2);
        assert_eq!(
            result.candidates[0].mean_accuracy,
            result.candidates[1].mean_accuracy
        );
        assert_eq!(result.best_index, 0);
    }

    #[test]
    fn grid_search_rejects_empty_grid() {
        let data = Dataset::generate(50, 3).unwrap();
        let grid = ParamGrid {
            n_estimators: vec![],
            ..ParamGrid::default()
        };
        let result = grid_search(
            &data.features(),
            &data.labels(),
            &grid,
            &StratifiedKFold::default(),
            42,
        );
        assert!(result.is_err());
    }
}
