//! Decision tree classifier

use crate::error::{Result, RiskError};
use super::models::{argmax_rows, check_training_data};
use super::params::{self, ModelParams};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Decision tree node.
///
/// Nodes live in a flat arena; children are indices into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the class distribution of its training samples
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    pub(crate) fn parse(key: &str, value: &Value) -> Result<Self> {
        match params::as_str(key, value)? {
            "gini" => Ok(Criterion::Gini),
            "entropy" | "log_loss" => Ok(Criterion::Entropy),
            _ => Err(RiskError::invalid_param(key, value, "expected gini or entropy")),
        }
    }

    fn impurity(self, counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini => 1.0 - counts.iter().map(|&c| (c / total).powi(2)).sum::<f64>(),
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features.max(1))
    }

    /// `"sqrt"`, `"log2"`, an integer count, a fraction in (0, 1], or `null` for all
    pub(crate) fn parse(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(MaxFeatures::All),
            Value::String(s) => match s.as_str() {
                "sqrt" | "auto" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                _ => Err(RiskError::invalid_param(key, value, "expected sqrt, log2, a number or null")),
            },
            Value::Number(n) if n.is_u64() => params::as_usize_min(key, value, 1).map(MaxFeatures::Fixed),
            _ => params::as_fraction(key, value).map(MaxFeatures::Fraction),
        }
    }
}

/// Candidate split for one feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// CART classification tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node arena; index 0 is the root
    nodes: Vec<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-node feature sampling
    pub random_state: Option<u64>,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub const NAME: &'static str = "DecisionTreeClassifier";

    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    /// Build from config parameters
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let mut tree = Self::new();
        for (key, value) in params {
            match key.as_str() {
                "max_depth" => tree.max_depth = params::as_opt_usize(key, value)?,
                "min_samples_split" => tree.min_samples_split = params::as_usize_min(key, value, 2)?,
                "min_samples_leaf" => tree.min_samples_leaf = params::as_usize_min(key, value, 1)?,
                "max_features" => tree.max_features = MaxFeatures::parse(key, value)?,
                "criterion" => tree.criterion = Criterion::parse(key, value)?,
                "random_state" => tree.random_state = Some(params::as_u64(key, value)?),
                k if params::is_ignored(k) => {}
                other => return Err(params::unknown(Self::NAME, other, value)),
            }
        }
        Ok(tree)
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to class codes `0..n_classes`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<&mut Self> {
        check_training_data(x, y, n_classes)?;
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indices(x, y, &indices, n_classes)
    }

    /// Fit on a subset of rows (repeats allowed, as in a bootstrap sample)
    pub(crate) fn fit_indices(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        indices: &[usize],
        n_classes: usize,
    ) -> Result<&mut Self> {
        if indices.is_empty() {
            return Err(RiskError::TrainingError("Cannot fit a tree on zero samples".to_string()));
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;
        self.nodes.clear();

        let mut importances = vec![0.0; self.n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let mut nodes = Vec::new();
        self.build_node(x, y, indices, 0, &mut nodes, &mut importances, &mut rng);
        self.nodes = nodes;

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= total);
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<TreeNode>,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let node_impurity = self.criterion.impurity(&counts, n_samples as f64);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || node_impurity <= 0.0;

        let split = if should_stop {
            None
        } else {
            self.find_best_split(x, y, indices, &counts, node_impurity, rng)
        };

        let Some(split) = split else {
            nodes.push(Self::leaf(&counts, n_samples));
            return nodes.len() - 1;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

        importances[split.feature_idx] += n_samples as f64 * split.gain;

        // Reserve the slot so the parent precedes its children
        nodes.push(Self::leaf(&counts, n_samples));
        let idx = nodes.len() - 1;
        let left = self.build_node(x, y, &left_indices, depth + 1, nodes, importances, rng);
        let right = self.build_node(x, y, &right_indices, depth + 1, nodes, importances, rng);

        nodes[idx] = TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity: node_impurity,
        };
        idx
    }

    fn leaf(counts: &[f64], n_samples: usize) -> TreeNode {
        let total = n_samples.max(1) as f64;
        TreeNode::Leaf {
            distribution: counts.iter().map(|&c| c / total).collect(),
            n_samples,
        }
    }

    fn class_counts(&self, y: &Array1<i64>, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[y[i] as usize] += 1.0;
        }
        counts
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        indices: &[usize],
        parent_counts: &[f64],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_try = self.max_features.resolve(self.n_features);
        let features: Vec<usize> = if n_try >= self.n_features {
            (0..self.n_features).collect()
        } else {
            index::sample(rng, self.n_features, n_try).into_vec()
        };

        // Each feature independently finds its best threshold
        features
            .par_iter()
            .filter_map(|&feature_idx| {
                self.best_threshold(x, y, indices, feature_idx, parent_counts, parent_impurity)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .fold(None, |best: Option<SplitCandidate>, candidate| match best {
                Some(b) if b.gain > candidate.gain => Some(b),
                Some(b) if b.gain == candidate.gain && b.feature_idx < candidate.feature_idx => Some(b),
                _ => Some(candidate),
            })
    }

    /// Sorted sweep over one feature; class counts move left one sample at a time
    fn best_threshold(
        &self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        indices: &[usize],
        feature_idx: usize,
        parent_counts: &[f64],
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut samples: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (x[[i, feature_idx]], y[i] as usize))
            .collect();
        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let n = samples.len();
        let mut left = vec![0.0; self.n_classes];
        let mut right = parent_counts.to_vec();
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n.saturating_sub(1) {
            let (value, class) = samples[pos];
            left[class] += 1.0;
            right[class] -= 1.0;

            let next = samples[pos + 1].0;
            if next <= value {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let weighted = (n_left as f64 * self.criterion.impurity(&left, n_left as f64)
                + n_right as f64 * self.criterion.impurity(&right, n_right as f64))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: (value + next) / 2.0,
                    gain,
                });
            }
        }
        best
    }

    fn leaf_distribution(&self, sample: ArrayView1<f64>) -> Option<&[f64]> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx)? {
                TreeNode::Leaf { distribution, .. } => return Some(distribution),
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    idx = if sample[*feature_idx] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Per-class probabilities, one row per sample
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.nodes.is_empty() {
            return Err(RiskError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(RiskError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let distribution = self.leaf_distribution(row).ok_or(RiskError::ModelNotFitted)?;
            for (k, &p) in distribution.iter().enumerate() {
                proba[[i, k]] = p;
            }
        }
        Ok(proba)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(argmax_rows(&self.predict_proba(x)?))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        if self.nodes.is_empty() {
            0
        } else {
            self.node_depth(0)
        }
    }

    fn node_depth(&self, idx: usize) -> usize {
        match &self.nodes[idx] {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + self.node_depth(*left).max(self.node_depth(*right)),
        }
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }
}
