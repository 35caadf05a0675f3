//! Linear classifiers

use crate::error::{Result, RiskError};
use super::models::{argmax_rows, check_training_data, one_hot_targets, softmax_rows};
use super::params::{self, ModelParams};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Multinomial logistic regression trained by full-batch gradient descent.
///
/// Minimizes mean cross-entropy plus `||W||² / (2 C n)`, the per-sample form of
/// the usual `C`-weighted objective. Binary problems use the same softmax
/// parameterization with two weight columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients, `n_features × n_classes`
    pub coefficients: Option<Array2<f64>>,
    /// Fitted intercepts, one per class
    pub intercept: Option<Array1<f64>>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Inverse regularization strength; `None` disables the penalty
    pub c: Option<f64>,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub const NAME: &'static str = "LogisticRegression";

    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            c: Some(1.0),
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.5,
            is_fitted: false,
        }
    }

    /// Build from config parameters
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let mut model = Self::new();
        let mut c = 1.0;
        let mut penalized = true;
        for (key, value) in params {
            match key.as_str() {
                "C" => c = params::as_positive_f64(key, value)?,
                "max_iter" => model.max_iter = params::as_usize_min(key, value, 1)?,
                "tol" => model.tol = params::as_non_negative_f64(key, value)?,
                "fit_intercept" => model.fit_intercept = params::as_bool(key, value)?,
                "learning_rate" => model.learning_rate = params::as_positive_f64(key, value)?,
                "penalty" => {
                    penalized = match value {
                        serde_json::Value::Null => false,
                        _ => match params::as_str(key, value)? {
                            "l2" => true,
                            "none" => false,
                            _ => return Err(RiskError::invalid_param(key, value, "expected l2 or none")),
                        },
                    }
                }
                // Gradient descent from zero weights is already deterministic
                "random_state" => {
                    params::as_u64(key, value)?;
                }
                k if params::is_ignored(k) => {}
                other => return Err(params::unknown(Self::NAME, other, value)),
            }
        }
        model.c = penalized.then_some(c);
        Ok(model)
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = Some(c);
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Fit the model using gradient descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<&mut Self> {
        check_training_data(x, y, n_classes)?;
        let n_samples = x.nrows() as f64;
        let targets = one_hot_targets(y, n_classes);

        let mut weights = Array2::<f64>::zeros((x.ncols(), n_classes));
        let mut bias = Array1::<f64>::zeros(n_classes);
        let penalty = self.c.map(|c| 1.0 / (c * n_samples));
        let lr = self.learning_rate;

        for _iter in 0..self.max_iter {
            let logits = x.dot(&weights) + &bias;
            let errors = softmax_rows(&logits) - &targets;

            let mut dw = x.t().dot(&errors) / n_samples;
            if let Some(lambda) = penalty {
                dw.scaled_add(lambda, &weights);
            }
            let db = if self.fit_intercept {
                errors.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_classes))
            } else {
                Array1::zeros(n_classes)
            };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db.mapv(|v| v * v).sum()).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights.scaled_add(-lr, &dw);
            bias.scaled_add(-lr, &db);
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.is_fitted = true;

        Ok(self)
    }

    fn logits(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(coefficients), Some(intercept)) = (&self.coefficients, &self.intercept) else {
            return Err(RiskError::ModelNotFitted);
        };
        if x.ncols() != coefficients.nrows() {
            return Err(RiskError::ShapeError {
                expected: format!("{} features", coefficients.nrows()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + intercept)
    }

    /// Predict probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(softmax_rows(&self.logits(x)?))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(argmax_rows(&self.logits(x)?))
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |w| w.nrows())
    }

    pub fn n_classes(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |w| w.ncols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    #[test]
    fn test_logistic_regression_binary() {
        let x = array![[1.0, 1.0], [1.5, 2.0], [2.0, 1.5], [5.0, 5.0], [5.5, 6.0], [6.0, 5.5]];
        let y = array![0, 0, 0, 1, 1, 1];

        let mut model = LogisticRegression::new().with_max_iter(1000).with_learning_rate(0.5);
        model.fit(&x, &y, 2).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_logistic_regression_multiclass_proba() {
        let x = array![[0.0], [0.2], [2.0], [2.2], [4.0], [4.2]];
        let y = array![0, 0, 1, 1, 2, 2];

        let mut model = LogisticRegression::new().with_c(100.0).with_max_iter(3000);
        model.fit(&x, &y, 3).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (6, 3));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(model.predict(&array![[0.1], [4.1]]).unwrap(), array![0, 2]);
    }

    #[test]
    fn test_not_fitted() {
        let model = LogisticRegression::new();
        assert!(matches!(model.predict(&array![[1.0]]), Err(RiskError::ModelNotFitted)));
    }

    #[test]
    fn test_from_params() {
        let mut p = ModelParams::new();
        p.insert("C".to_string(), json!(0.5));
        p.insert("max_iter".to_string(), json!(200));
        p.insert("verbose".to_string(), json!(0));
        let model = LogisticRegression::from_params(&p).unwrap();
        assert_eq!(model.c, Some(0.5));
        assert_eq!(model.max_iter, 200);

        p.insert("penalty".to_string(), json!("none"));
        assert_eq!(LogisticRegression::from_params(&p).unwrap().c, None);

        p.insert("penalty".to_string(), json!("l1"));
        assert!(LogisticRegression::from_params(&p).is_err());
    }
}
