//! # Decision Tree
//!
//! Binary CART classifier with Gini impurity, the building block of the
//! random forest.
//!
//! Nodes live in a flat arena (`Vec<Node>`) with the root at index 0.
//! Samples go left when `row[feature] <= threshold`. Leaves store the
//! fraction of class-1 samples that reached them.

use crate::{Error, N_FEATURES, Result, Row, WATCH};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

// =============================================================================
// PARAMETERS
// =============================================================================

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; `None` grows until leaves are pure or too small.
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may split.
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
    /// Features examined per split (more are tried if none of them splits).
    pub max_features: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: N_FEATURES,
        }
    }
}

impl TreeParams {
    fn validate(&self) -> Result<()> {
        if self.min_samples_leaf == 0 {
            return Err(Error::InvalidParameter(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(Error::InvalidParameter(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.max_features == 0 || self.max_features > N_FEATURES {
            return Err(Error::InvalidParameter(format!(
                "max_features must be in 1..={N_FEATURES}"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TREE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    importances: Row,
}

impl DecisionTree {
    /// Fit a tree on the rows named by `indices`.
    ///
    /// `indices` may repeat (bootstrap samples); a repeated row counts once
    /// per occurrence. `labels` must be 0/1.
    pub fn fit(
        rows: &[Row],
        labels: &[u8],
        mut indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        params.validate()?;
        if rows.len() != labels.len() {
            return Err(Error::InvalidParameter(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if indices.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot fit tree on zero samples".into(),
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= rows.len()) {
            return Err(Error::InvalidParameter(format!(
                "sample index {bad} out of range"
            )));
        }

        let mut builder = TreeBuilder {
            rows,
            labels,
            params,
            rng,
            nodes: Vec::new(),
            importances: [0.0; N_FEATURES],
        };
        builder.build(&mut indices, 0);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        Ok(Self {
            nodes: builder.nodes,
            importances,
        })
    }

    /// Probability of class 1 for a row.
    #[must_use]
    pub fn predict_proba(&self, row: &Row) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { proba }) => return *proba,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let Some(value) = row.get(*feature) else {
                        return 0.0;
                    };
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    /// Check the node arena of a deserialized tree.
    ///
    /// Children must sit after their parent and inside the arena, which
    /// rules out cycles, and split features must be real columns.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::Format("tree has no nodes".into()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { proba } => {
                    if !(0.0..=1.0).contains(&proba) {
                        return Err(Error::Format(format!(
                            "node {idx}: leaf probability {proba} outside [0, 1]"
                        )));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= N_FEATURES {
                        return Err(Error::Format(format!(
                            "node {idx}: split feature {feature} out of range"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(Error::Format(format!("node {idx}: threshold is NaN")));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(Error::Format(format!(
                                "node {idx}: child index {child} is invalid"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Impurity-decrease importances, normalized to sum 1 (all zero for a stump).
    #[must_use]
    pub fn feature_importances(&self) -> &Row {
        &self.importances
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                Some(Node::Leaf { .. }) => max_depth = max_depth.max(depth),
                None => {}
            }
        }
        max_depth
    }
}

// =============================================================================
// BUILDER
// =============================================================================

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [Row],
    labels: &'a [u8],
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
    importances: Row,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let n = indices.len();
        let positives = self.positives(indices);
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            proba: positives as f64 / n as f64,
        });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let too_small = n < self.params.min_samples_split || n < 2 * self.params.min_samples_leaf;
        let pure = positives == 0 || positives == n;
        if depth_reached || too_small || pure {
            return node_id;
        }

        let Some(split) = self.best_split(indices, positives) else {
            return node_id;
        };
        self.importances[split.feature] += n as f64 * split.improvement;

        let rows = self.rows;
        let mid = partition(indices, |i| rows[i][split.feature] <= split.threshold);
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.build(left_indices, depth + 1);
        let right = self.build(right_indices, depth + 1);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    fn positives(&self, indices: &[usize]) -> usize {
        indices.iter().filter(|&&i| self.labels[i] == WATCH).count()
    }

    /// Best Gini split over a random feature order.
    ///
    /// Stops after `max_features` features once a valid split is known.
    fn best_split(&mut self, indices: &[usize], positives: usize) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let parent = gini(positives, n);

        let mut features: Vec<usize> = (0..N_FEATURES).collect();
        features.shuffle(&mut *self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, bool)> = Vec::with_capacity(n);

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }

            pairs.clear();
            pairs.extend(
                indices
                    .iter()
                    .map(|&i| (self.rows[i][feature], self.labels[i] == WATCH)),
            );
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_pos = 0usize;
            for i in 0..n - 1 {
                left_pos += usize::from(pairs[i].1);
                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }
                let (lo, hi) = (pairs[i].0, pairs[i + 1].0);
                if lo >= hi {
                    continue;
                }

                let weighted = (left_n as f64 * gini(left_pos, left_n)
                    + right_n as f64 * gini(positives - left_pos, right_n))
                    / n as f64;
                let improvement = parent - weighted;

                if best.as_ref().is_none_or(|b| improvement > b.improvement) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        improvement,
                    });
                }
            }
        }

        best
    }
}

/// Gini impurity of a binary node.
fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Move indices satisfying `goes_left` to the front; returns how many did.
fn partition(indices: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for j in 0..indices.len() {
        if goes_left(indices[j]) {
            indices.swap(mid, j);
            mid += 1;
        }
    }
    mid
}

// =============================================================================
// TESTS
// =============================================================================
