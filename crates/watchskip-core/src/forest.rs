//! # Random Forest
//!
//! Bagged ensemble of CART trees.
//!
//! Every tree sees a bootstrap sample of the training rows and considers
//! `floor(sqrt(5)) = 2` random features per split. Tree `i` draws from a
//! `StdRng` seeded with `seed + i`, so a fitted forest depends only on its
//! data and parameters.

use crate::tree::{DecisionTree, TreeParams};
use crate::{Error, N_FEATURES, Result, Row, SKIP, WATCH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hyperparameters searched by the grid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl fmt::Display for RandomForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "None".to_owned(), |d| d.to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_leaf={}",
            self.n_estimators, depth, self.min_samples_leaf
        )
    }
}

/// Features considered per split.
fn max_features() -> usize {
    ((N_FEATURES as f64).sqrt() as usize).max(1)
}

/// A fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: RandomForestParams,
    trees: Vec<DecisionTree>,
    importances: Row,
}

impl RandomForest {
    /// Fit the forest on all rows.
    pub fn fit(rows: &[Row], labels: &[u8], params: RandomForestParams) -> Result<Self> {
        if params.n_estimators == 0 {
            return Err(Error::InvalidParameter(
                "n_estimators must be at least 1".into(),
            ));
        }
        if rows.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot fit forest on zero rows".into(),
            ));
        }
        if rows.len() != labels.len() {
            return Err(Error::InvalidParameter(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: 2,
            min_samples_leaf: params.min_samples_leaf,
            max_features: max_features(),
        };

        let n = rows.len();
        let mut trees = Vec::with_capacity(params.n_estimators);
        for i in 0..params.n_estimators {
            let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(DecisionTree::fit(
                rows,
                labels,
                bootstrap,
                &tree_params,
                &mut rng,
            )?);
        }

        let mut importances = [0.0; N_FEATURES];
        for tree in &trees {
            for (acc, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        Ok(Self {
            params,
            trees,
            importances,
        })
    }

    /// Mean class-1 probability across trees.
    #[must_use]
    pub fn predict_proba(&self, row: &Row) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Predicted class: 1 when the mean probability exceeds one half.
    #[must_use]
    pub fn predict(&self, row: &Row) -> u8 {
        if self.predict_proba(row) > 0.5 { WATCH } else { SKIP }
    }

    #[must_use]
    pub fn predict_many(&self, rows: &[Row]) -> Vec<u8> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    /// Mean impurity-decrease importances, summing to 1 unless no tree split.
    #[must_use]
    pub fn feature_importances(&self) -> &Row {
        &self.importances
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Nodes across all trees.
    #[must_use]
    pub fn total_nodes(&self) -> usize {
        self.trees.iter().map(DecisionTree::node_count).sum()
    }

    /// Depth of the deepest tree.
    #[must_use]
    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }

    /// Check a deserialized forest before it is used for prediction.
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::Format("forest has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| match e {
                Error::Format(msg) => Error::Format(format!("tree {i}: {msg}")),
                other => other,
            })?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
