//! Support Vector Classifier
//!
//! One-vs-rest kernel SVMs trained with SMO (Sequential Minimal Optimization).

use crate::error::{Result, RiskError};
use super::models::{argmax_rows, check_training_data, softmax_rows};
use super::params::{self, ModelParams};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training returns an error instead of allocating n² floats.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel gamma as configured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features · Var(X))`
    Scale,
    /// `1 / n_features`
    Auto,
    Value(f64),
}

impl Gamma {
    fn parse(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) if s == "scale" => Ok(Gamma::Scale),
            Value::String(s) if s == "auto" => Ok(Gamma::Auto),
            Value::String(_) => Err(RiskError::invalid_param(key, value, "expected scale, auto or a number")),
            _ => params::as_positive_f64(key, value).map(Gamma::Value),
        }
    }

    fn resolve(self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self {
            Gamma::Value(g) => g,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }
}

/// Kernel family as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelKind {
    Linear,
    Polynomial,
    RBF,
    Sigmoid,
}

/// Kernel function with resolved parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Polynomial kernel: K(x, y) = (γ * x · y + r)^d
    Polynomial { degree: usize, gamma: f64, coef0: f64 },
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    RBF { gamma: f64 },
    /// Sigmoid kernel: K(x, y) = tanh(γ * x · y + r)
    Sigmoid { gamma: f64, coef0: f64 },
}

impl KernelType {
    fn compute(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            KernelType::Linear => a.dot(&b),
            KernelType::Polynomial { degree, gamma, coef0 } => {
                (gamma * a.dot(&b) + coef0).powi((*degree).min(i32::MAX as usize) as i32)
            }
            KernelType::RBF { gamma } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
                (-gamma * norm_sq).exp()
            }
            KernelType::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub kernel: KernelKind,
    pub gamma: Gamma,
    /// Polynomial degree
    pub degree: usize,
    /// Independent term for polynomial and sigmoid kernels
    pub coef0: f64,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of SMO sweeps
    pub max_iter: usize,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelKind::RBF,
            gamma: Gamma::Scale,
            degree: 3,
            coef0: 0.0,
            tol: 1e-3,
            max_iter: 1000,
            random_state: Some(42),
        }
    }
}

impl SVMConfig {
    fn kernel_for(&self, x: &Array2<f64>) -> KernelType {
        let gamma = self.gamma.resolve(x);
        match self.kernel {
            KernelKind::Linear => KernelType::Linear,
            KernelKind::Polynomial => KernelType::Polynomial {
                degree: self.degree,
                gamma,
                coef0: self.coef0,
            },
            KernelKind::RBF => KernelType::RBF { gamma },
            KernelKind::Sigmoid => KernelType::Sigmoid { gamma, coef0: self.coef0 },
        }
    }
}

/// A single binary SVM trained for one class vs rest
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySVM {
    support_vectors: Array2<f64>,
    /// alpha_i * y_i per support vector
    dual_coef: Array1<f64>,
    bias: f64,
}

impl BinarySVM {
    fn score(&self, kernel: &KernelType, sample: ArrayView1<f64>) -> f64 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(self.dual_coef.iter())
            .map(|(sv, &coef)| coef * kernel.compute(sample, sv))
            .sum::<f64>()
            + self.bias
    }
}

/// Support Vector Classifier.
///
/// Every class gets its own one-vs-rest machine. Class probabilities are the
/// softmax of the per-class decision scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVC {
    config: SVMConfig,
    kernel: Option<KernelType>,
    machines: Vec<BinarySVM>,
    n_features: usize,
}

impl Default for SVC {
    fn default() -> Self {
        Self::new(SVMConfig::default())
    }
}

impl SVC {
    pub const NAME: &'static str = "SVC";

    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            machines: Vec::new(),
            n_features: 0,
        }
    }

    /// Build from config parameters
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let mut config = SVMConfig::default();
        for (key, value) in params {
            match key.as_str() {
                "C" => config.c = params::as_positive_f64(key, value)?,
                "kernel" => {
                    config.kernel = match params::as_str(key, value)? {
                        "linear" => KernelKind::Linear,
                        "poly" => KernelKind::Polynomial,
                        "rbf" => KernelKind::RBF,
                        "sigmoid" => KernelKind::Sigmoid,
                        _ => {
                            return Err(RiskError::invalid_param(
                                key,
                                value,
                                "expected linear, poly, rbf or sigmoid",
                            ))
                        }
                    }
                }
                "gamma" => config.gamma = Gamma::parse(key, value)?,
                "degree" => config.degree = params::as_usize_min(key, value, 1)?,
                "coef0" => config.coef0 = params::as_f64(key, value)?,
                "tol" => config.tol = params::as_positive_f64(key, value)?,
                "max_iter" => config.max_iter = params::as_usize_min(key, value, 1)?,
                "random_state" => config.random_state = Some(params::as_u64(key, value)?),
                // Probabilities are always available
                "probability" => {
                    params::as_bool(key, value)?;
                }
                k if params::is_ignored(k) => {}
                other => return Err(params::unknown(Self::NAME, other, value)),
            }
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Fit one machine per class
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<&mut Self> {
        check_training_data(x, y, n_classes)?;
        let n = x.nrows();
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(RiskError::InvalidInput(format!(
                "Dataset has {} samples, exceeding the maximum {} for the SVM kernel matrix",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let kernel = self.config.kernel_for(x);
        let kernel_matrix = compute_kernel_matrix(&kernel, x);
        let base_seed = self.config.random_state;

        let machines: Vec<BinarySVM> = (0..n_classes)
            .into_par_iter()
            .map(|class| {
                let y_binary: Array1<f64> = y.mapv(|v| if v as usize == class { 1.0 } else { -1.0 });
                let mut rng = match base_seed {
                    Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(class as u64)),
                    None => Xoshiro256PlusPlus::from_entropy(),
                };
                let (alphas, bias) = smo_train(&self.config, &kernel_matrix, &y_binary, &mut rng);

                let support: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
                debug!(class, support_vectors = support.len(), "Trained one-vs-rest SVM");
                BinarySVM {
                    support_vectors: x.select(ndarray::Axis(0), &support),
                    dual_coef: support.iter().map(|&i| alphas[i] * y_binary[i]).collect(),
                    bias,
                }
            })
            .collect();

        self.kernel = Some(kernel);
        self.machines = machines;
        self.n_features = x.ncols();
        Ok(self)
    }

    /// Per-class one-vs-rest decision scores
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let Some(kernel) = &self.kernel else {
            return Err(RiskError::ModelNotFitted);
        };
        if x.ncols() != self.n_features {
            return Err(RiskError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut scores = Array2::zeros((x.nrows(), self.machines.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (k, machine) in self.machines.iter().enumerate() {
                scores[[i, k]] = machine.score(kernel, row);
            }
        }
        Ok(scores)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(softmax_rows(&self.decision_function(x)?))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(argmax_rows(&self.decision_function(x)?))
    }

    /// Total support vectors across machines
    pub fn n_support_vectors(&self) -> usize {
        self.machines.iter().map(|m| m.support_vectors.nrows()).sum()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.machines.len()
    }
}

/// Compute kernel matrix, upper-triangle rows in parallel
fn compute_kernel_matrix(kernel: &KernelType, x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| (i..n).map(|j| kernel.compute(x.row(i), x.row(j))).collect())
        .collect();

    let mut k = Array2::zeros((n, n));
    for (i, row_vals) in rows.into_iter().enumerate() {
        for (offset, val) in row_vals.into_iter().enumerate() {
            let j = i + offset;
            k[[i, j]] = val;
            k[[j, i]] = val;
        }
    }
    k
}

/// Simplified SMO; returns the multipliers and bias.
///
/// Decision values are cached and updated incrementally after every accepted
/// pair update.
fn smo_train(
    config: &SVMConfig,
    k: &Array2<f64>,
    y: &Array1<f64>,
    rng: &mut Xoshiro256PlusPlus,
) -> (Array1<f64>, f64) {
    let n = y.len();
    let c = config.c;
    let mut alphas = Array1::<f64>::zeros(n);
    let mut bias = 0.0;
    // f[i] = sum_k alpha_k y_k K(k, i), without bias
    let mut f = Array1::<f64>::zeros(n);

    if n < 2 {
        return (alphas, bias);
    }

    let max_passes = 5;
    let mut passes = 0;
    let mut total_iter = 0;

    while passes < max_passes && total_iter < config.max_iter {
        let mut num_changed = 0;

        for i in 0..n {
            let e_i = f[i] + bias - y[i];
            let violates = (y[i] * e_i < -config.tol && alphas[i] < c)
                || (y[i] * e_i > config.tol && alphas[i] > 0.0);
            if !violates {
                continue;
            }

            let j = loop {
                let j = rng.gen_range(0..n);
                if j != i {
                    break j;
                }
            };
            let e_j = f[j] + bias - y[j];

            let alpha_i_old = alphas[i];
            let alpha_j_old = alphas[j];

            let (l, h) = if y[i] != y[j] {
                ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
            } else {
                ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
            };
            if (l - h).abs() < 1e-10 {
                continue;
            }

            let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
            if eta >= 0.0 {
                continue;
            }

            let alpha_j = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(l, h);
            if (alpha_j - alpha_j_old).abs() < 1e-5 {
                continue;
            }
            let alpha_i = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j);

            let d_i = y[i] * (alpha_i - alpha_i_old);
            let d_j = y[j] * (alpha_j - alpha_j_old);

            let b1 = bias - e_i - d_i * k[[i, i]] - d_j * k[[i, j]];
            let b2 = bias - e_j - d_i * k[[i, j]] - d_j * k[[j, j]];
            bias = if alpha_i > 0.0 && alpha_i < c {
                b1
            } else if alpha_j > 0.0 && alpha_j < c {
                b2
            } else {
                (b1 + b2) / 2.0
            };

            alphas[i] = alpha_i;
            alphas[j] = alpha_j;
            f.scaled_add(d_i, &k.row(i));
            f.scaled_add(d_j, &k.row(j));

            num_changed += 1;
        }

        total_iter += 1;
        if num_changed == 0 {
            passes += 1;
        } else {
            passes = 0;
        }
    }

    (alphas, bias)
}
