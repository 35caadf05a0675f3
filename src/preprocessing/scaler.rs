//! Standard scaling over feature matrices

use crate::error::{Result, RiskError};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-feature centre and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

/// Z-score scaler: `(x - mean) / std`, population standard deviation.
///
/// Fitted once on the training matrix and applied unchanged afterwards.
/// Zero-variance features get scale 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute per-column mean and standard deviation
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(RiskError::PreprocessingError(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| RiskError::PreprocessingError("Empty matrix".to_string()))?;
        let stds = x.std_axis(Axis(0), 0.0);

        self.params = means
            .iter()
            .zip(stds.iter())
            .map(|(&center, &std)| ScalerParams {
                center,
                scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x)?;
        let mut out = x.clone();
        for (mut column, p) in out.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            column.mapv_inplace(|v| (v - p.center) / p.scale);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(RiskError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(RiskError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0], [5.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        let mean = scaled.column(0).mean().unwrap();
        assert!(mean.abs() < 1e-10);
        // population std of 1..=5 is sqrt(2)
        assert!((scaler.params()[0].scale - 2f64.sqrt()).abs() < 1e-12);
        // constant column keeps scale 1
        assert_eq!(scaler.params()[1].scale, 1.0);
        assert!(scaled.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let result = scaler.transform(&array![[1.0, 2.0, 3.0]]);
        assert!(matches!(result, Err(RiskError::ShapeError { .. })));
    }

    #[test]
    fn test_unfitted_scaler() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(RiskError::ModelNotFitted)
        ));
    }
}
