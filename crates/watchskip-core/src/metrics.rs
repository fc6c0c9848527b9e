//! # Metrics Module
//!
//! Accuracy, the 2x2 confusion matrix and a per-class classification
//! report for binary Watch/Skip predictions. Class order is always
//! Skip (0) then Watch (1).

use crate::{SKIP, WATCH};
use serde::{Deserialize, Serialize};

/// Display names in class order.
pub const CLASS_NAMES: [&str; 2] = ["Skip", "Watch"];

/// Fraction of positions where `predicted` equals `truth`. Zero when empty.
#[must_use]
pub fn accuracy(truth: &[u8], predicted: &[u8]) -> f64 {
    let n = truth.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / n as f64
}

// =============================================================================
// CONFUSION MATRIX
// =============================================================================

/// Rows are true classes, columns predicted classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Count (truth, predicted) pairs. Labels other than 0/1 are ignored.
    #[must_use]
    pub fn from_predictions(truth: &[u8], predicted: &[u8]) -> Self {
        let mut counts = [[0usize; 2]; 2];
        for (&t, &p) in truth.iter().zip(predicted) {
            if (t == SKIP || t == WATCH) && (p == SKIP || p == WATCH) {
                counts[usize::from(t)][usize::from(p)] += 1;
            }
        }
        Self { counts }
    }

    #[must_use]
    pub fn true_positives(&self) -> usize {
        self.counts[1][1]
    }

    #[must_use]
    pub fn true_negatives(&self) -> usize {
        self.counts[0][0]
    }

    #[must_use]
    pub fn false_positives(&self) -> usize {
        self.counts[0][1]
    }

    #[must_use]
    pub fn false_negatives(&self) -> usize {
        self.counts[1][0]
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Plain-text table.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{:>12}{:>8}{:>8}\n", "", "Skip", "Watch"));
        for (class, row) in CLASS_NAMES.iter().zip(&self.counts) {
            out.push_str(&format!("{:>12}{:>8}{:>8}\n", class, row[0], row[1]));
        }
        out
    }
}

// =============================================================================
// CLASSIFICATION REPORT
// =============================================================================

/// Precision, recall and F1 of one class (or an average).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Indexed by class label.
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationReport {
    #[must_use]
    pub fn from_predictions(truth: &[u8], predicted: &[u8]) -> Self {
        let cm = ConfusionMatrix::from_predictions(truth, predicted);
        let mut classes = [ClassMetrics::default(); 2];
        for (c, metrics) in classes.iter_mut().enumerate() {
            let tp = cm.counts[c][c];
            let predicted_c = cm.counts[0][c] + cm.counts[1][c];
            let actual_c = cm.counts[c][0] + cm.counts[c][1];
            let precision = ratio(tp, predicted_c);
            let recall = ratio(tp, actual_c);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            *metrics = ClassMetrics {
                precision,
                recall,
                f1,
                support: actual_c,
            };
        }

        let total: usize = classes.iter().map(|m| m.support).sum();
        let macro_avg = ClassMetrics {
            precision: classes.iter().map(|m| m.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|m| m.recall).sum::<f64>() / 2.0,
            f1: classes.iter().map(|m| m.f1).sum::<f64>() / 2.0,
            support: total,
        };
        let weight = |m: &ClassMetrics| ratio(m.support, total);
        let weighted_avg = ClassMetrics {
            precision: classes.iter().map(|m| m.precision * weight(m)).sum(),
            recall: classes.iter().map(|m| m.recall * weight(m)).sum(),
            f1: classes.iter().map(|m| m.f1 * weight(m)).sum(),
            support: total,
        };

        Self {
            classes,
            accuracy: accuracy(truth, predicted),
            macro_avg,
            weighted_avg,
        }
    }

    /// Fixed-width table in the familiar precision/recall/f1/support layout.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:>14}{:>11}{:>11}{:>11}{:>11}\n\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        for (name, m) in CLASS_NAMES.iter().zip(&self.classes) {
            out.push_str(&format_line(name, m));
        }
        out.push('\n');
        out.push_str(&format!(
            "{:>14}{:>11}{:>11}{:>11.2}{:>11}\n",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        ));
        out.push_str(&format_line("macro avg", &self.macro_avg));
        out.push_str(&format_line("weighted avg", &self.weighted_avg));
        out
    }
}

fn format_line(name: &str, m: &ClassMetrics) -> String {
    format!(
        "{:>14}{:>11.2}{:>11.2}{:>11.2}{:>11}\n",
        name, m.precision, m.recall, m.f1, m.support
    )
}

// =============================================================================
// TESTS
// =============================================================================
