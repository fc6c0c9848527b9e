//! Per-column standardization (zero mean, unit variance).

use crate::{Error, N_FEATURES, Result, Row};
use serde::{Deserialize, Serialize};

/// Standard scaler fitted on a training set.
///
/// Uses the population standard deviation. A constant column is scaled by 1
/// so it maps to zero instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Row,
    scale: Row,
}

impl StandardScaler {
    /// Fit column means and deviations.
    pub fn fit(rows: &[Row]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot fit scaler on zero rows".into(),
            ));
        }
        let n = rows.len() as f64;
        let mut mean = [0.0; N_FEATURES];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut scale = [0.0; N_FEATURES];
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut scale {
            let std = (*s / n).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        Ok(Self { mean, scale })
    }

    #[must_use]
    pub fn transform_row(&self, row: &Row) -> Row {
        let mut out = [0.0; N_FEATURES];
        for (i, o) in out.iter_mut().enumerate() {
            *o = (row[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    #[must_use]
    pub fn transform(&self, rows: &[Row]) -> Vec<Row> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    #[must_use]
    pub fn mean(&self) -> &Row {
        &self.mean
    }

    #[must_use]
    pub fn scale(&self) -> &Row {
        &self.scale
    }

    /// Check a deserialized scaler: finite means, finite non-zero scales.
    pub fn validate(&self) -> Result<()> {
        if !self.mean.iter().all(|m| m.is_finite()) {
            return Err(Error::Format("scaler mean is not finite".into()));
        }
        if !self.scale.iter().all(|s| s.is_finite() && s.abs() > 0.0) {
            return Err(Error::Format(
                "scaler scale must be finite and non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fit_rejects_empty() {
        assert!(StandardScaler::fit(&[]).is_err());
    }

    #[test]
    fn transformed_columns_are_standardized() {
        let rows = vec![
            [1.0, 10.0, 5.0, 0.0, -1.0],
            [2.0, 20.0, 5.0, 0.5, 0.0],
            [3.0, 30.0, 5.0, 1.0, 1.0],
        ];
        let scaler = StandardScaler::fit(&rows).unwrap();
        let out = scaler.transform(&rows);

        for col in 0..N_FEATURES {
            let mean: f64 = out.iter().map(|r| r[col]).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12, "column {col} mean {mean}");
        }
        // Population std of [1, 2, 3] is sqrt(2/3).
        assert!((scaler.scale()[0] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let rows = vec![[4.0; N_FEATURES], [4.0; N_FEATURES]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.transform_row(&[4.0; N_FEATURES]), [0.0; N_FEATURES]);
    }
}
