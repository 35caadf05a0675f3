//! XGBoost-style gradient boosting with second-order approximation
//!
//! Multiclass softmax objective: each boosting round fits one regression tree
//! per class on the gradient `p_k - 1[y = k]` and hessian `2 p_k (1 - p_k)`.
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - L1 (alpha) soft-thresholding of leaf gradients
//! - Minimum child weight constraint

use crate::error::{Result, RiskError};
use super::models::{argmax_rows, check_training_data, softmax_rows};
use super::params::{self, ModelParams};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// XGBoost configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

/// A single node in a boosted tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree over gradient statistics, stored as a node arena
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct XGBTree {
    nodes: Vec<XGBNode>,
}

impl XGBTree {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        while let Some(node) = self.nodes.get(idx) {
            match node {
                XGBNode::Leaf { weight } => return *weight,
                XGBNode::Split { feature, threshold, left, right } => {
                    idx = if sample[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
        0.0
    }
}

/// Gradient statistics for one tree
struct GradStats<'a> {
    grad: &'a [f64],
    hess: &'a [f64],
}

/// Build a tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    stats: &GradStats,
    indices: &[usize],
    feature_indices: &[usize],
    config: &XGBoostConfig,
) -> XGBTree {
    let mut tree = XGBTree::default();
    grow(x, stats, indices, feature_indices, 0, config, &mut tree.nodes);
    tree
}

fn grow(
    x: &Array2<f64>,
    stats: &GradStats,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
    nodes: &mut Vec<XGBNode>,
) -> usize {
    let g_sum: f64 = indices.iter().map(|&i| stats.grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| stats.hess[i]).sum();
    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    let best_split = if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        None
    } else {
        feature_indices
            .par_iter()
            .filter_map(|&f| find_best_split_for_feature(x, stats, indices, f, config))
            .collect::<Vec<_>>()
            .into_iter()
            .fold(None, |best: Option<(usize, f64, f64)>, cand| match best {
                Some(b) if b.2 >= cand.2 => Some(b),
                _ => Some(cand),
            })
    };

    let split = best_split.filter(|&(_, _, gain)| gain > config.gamma);
    let Some((feature, threshold, _)) = split else {
        nodes.push(XGBNode::Leaf { weight: leaf_weight });
        return nodes.len() - 1;
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
        indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

    if left_idx.is_empty() || right_idx.is_empty() {
        nodes.push(XGBNode::Leaf { weight: leaf_weight });
        return nodes.len() - 1;
    }

    nodes.push(XGBNode::Leaf { weight: leaf_weight });
    let idx = nodes.len() - 1;
    let left = grow(x, stats, &left_idx, feature_indices, depth + 1, config, nodes);
    let right = grow(x, stats, &right_idx, feature_indices, depth + 1, config, nodes);
    nodes[idx] = XGBNode::Split { feature, threshold, left, right };
    idx
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g_sum > alpha {
        g_sum - alpha
    } else if g_sum < -alpha {
        g_sum + alpha
    } else {
        return 0.0;
    };
    -g_adj / (h_sum + lambda)
}

/// Best `(feature, threshold, gain)` for one feature
fn find_best_split_for_feature(
    x: &Array2<f64>,
    stats: &GradStats,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<(usize, f64, f64)> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| x[[a, feature]].partial_cmp(&x[[b, feature]]).unwrap_or(Ordering::Equal));

    let g_total: f64 = sorted.iter().map(|&i| stats.grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| stats.hess[i]).sum();
    let lambda = config.reg_lambda;
    let parent_score = g_total * g_total / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(usize, f64, f64)> = None;

    for pos in 0..sorted.len().saturating_sub(1) {
        let idx = sorted[pos];
        g_left += stats.grad[idx];
        h_left += stats.hess[idx];

        let value = x[[idx, feature]];
        let next = x[[sorted[pos + 1], feature]];
        if next <= value {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                - parent_score);

        if best.map_or(true, |b| gain > b.2) {
            best = Some((feature, (value + next) / 2.0, gain));
        }
    }
    best
}

/// Gradient-boosted tree classifier with a softmax objective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBClassifier {
    config: XGBoostConfig,
    /// `rounds[r][k]` is the round-r tree for class k
    rounds: Vec<Vec<XGBTree>>,
    n_features: usize,
    n_classes: usize,
}

impl Default for XGBClassifier {
    fn default() -> Self {
        Self::new(XGBoostConfig::default())
    }
}

impl XGBClassifier {
    pub const NAME: &'static str = "XGBClassifier";

    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            rounds: Vec::new(),
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Build from config parameters; XGBoost aliases are accepted
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let mut config = XGBoostConfig::default();
        for (key, value) in params {
            match key.as_str() {
                "n_estimators" => config.n_estimators = params::as_usize_min(key, value, 1)?,
                "learning_rate" | "eta" => config.learning_rate = params::as_positive_f64(key, value)?,
                "max_depth" => config.max_depth = params::as_usize_min(key, value, 1)?,
                "min_child_weight" => config.min_child_weight = params::as_non_negative_f64(key, value)?,
                "reg_lambda" | "lambda" => config.reg_lambda = params::as_non_negative_f64(key, value)?,
                "reg_alpha" | "alpha" => config.reg_alpha = params::as_non_negative_f64(key, value)?,
                "gamma" => config.gamma = params::as_non_negative_f64(key, value)?,
                "subsample" => config.subsample = params::as_fraction(key, value)?,
                "colsample_bytree" => config.colsample_bytree = params::as_fraction(key, value)?,
                "random_state" | "seed" => config.random_state = Some(params::as_u64(key, value)?),
                // Evaluation-only setting; training always uses the softmax loss
                "eval_metric" => {}
                k if params::is_ignored(k) => {}
                other => return Err(params::unknown(Self::NAME, other, value)),
            }
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<&mut Self> {
        check_training_data(x, y, n_classes)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        self.n_features = n_features;
        self.n_classes = n_classes;
        self.rounds.clear();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut raw = Array2::<f64>::zeros((n_samples, n_classes));

        for _ in 0..self.config.n_estimators {
            let proba = softmax_rows(&raw);
            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices: Vec<Vec<usize>> = (0..n_classes)
                .map(|_| subsample(&mut rng, n_features, self.config.colsample_bytree))
                .collect();

            let trees: Vec<XGBTree> = (0..n_classes)
                .into_par_iter()
                .map(|k| {
                    let (grad, hess): (Vec<f64>, Vec<f64>) = (0..n_samples)
                        .map(|i| {
                            let p = proba[[i, k]];
                            let target = if y[i] as usize == k { 1.0 } else { 0.0 };
                            (p - target, (2.0 * p * (1.0 - p)).max(1e-6))
                        })
                        .unzip();
                    let stats = GradStats { grad: &grad, hess: &hess };
                    build_xgb_tree(x, &stats, &row_indices, &col_indices[k], &self.config)
                })
                .collect();

            for (i, row) in x.rows().into_iter().enumerate() {
                for (k, tree) in trees.iter().enumerate() {
                    raw[[i, k]] += self.config.learning_rate * tree.predict(row);
                }
            }

            self.rounds.push(trees);
        }

        Ok(self)
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.rounds.is_empty() {
            return Err(RiskError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(RiskError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut raw = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            for trees in &self.rounds {
                for (k, tree) in trees.iter().enumerate() {
                    raw[[i, k]] += self.config.learning_rate * tree.predict(row);
                }
            }
        }
        Ok(raw)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(softmax_rows(&self.raw_scores(x)?))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(argmax_rows(&self.raw_scores(x)?))
    }

    /// Split-count importances across all trees
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in self.rounds.iter().flatten() {
            for node in &tree.nodes {
                if let XGBNode::Split { feature, .. } = node {
                    counts[*feature] += 1.0;
                }
            }
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Some(Array1::from_vec(counts))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}
