//! Random Forest classifier

use crate::error::{Result, RiskError};
use super::decision_tree::{Criterion, DecisionTree, MaxFeatures};
use super::models::{argmax_rows, check_training_data};
use super::params::{self, ModelParams};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
    n_classes: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub const NAME: &'static str = "RandomForestClassifier";

    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            feature_importances: None,
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Build from config parameters
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let mut forest = Self::default();
        for (key, value) in params {
            match key.as_str() {
                "n_estimators" => forest.n_estimators = params::as_usize_min(key, value, 1)?,
                "max_depth" => forest.max_depth = params::as_opt_usize(key, value)?,
                "min_samples_split" => forest.min_samples_split = params::as_usize_min(key, value, 2)?,
                "min_samples_leaf" => forest.min_samples_leaf = params::as_usize_min(key, value, 1)?,
                "max_features" => forest.max_features = MaxFeatures::parse(key, value)?,
                "criterion" => forest.criterion = Criterion::parse(key, value)?,
                "bootstrap" => forest.bootstrap = params::as_bool(key, value)?,
                "random_state" => forest.random_state = Some(params::as_u64(key, value)?),
                k if params::is_ignored(k) => {}
                other => return Err(params::unknown(Self::NAME, other, value)),
            }
        }
        Ok(forest)
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest to class codes `0..n_classes`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<&mut Self> {
        check_training_data(x, y, n_classes)?;
        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.n_classes = n_classes;

        // Tree i draws from its own stream seeded base_seed + i
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(self.max_features)
                    .with_criterion(self.criterion)
                    .with_random_state(rng.gen());
                tree.max_depth = self.max_depth;

                tree.fit_indices(x, y, &sample_indices, n_classes)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, &val) in total.iter_mut().zip(imp.iter()) {
                    *acc += val;
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|imp| *imp /= sum);
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Mean of the per-tree class distributions
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(RiskError::ModelNotFitted);
        }

        let per_tree: Vec<Array2<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for p in &per_tree {
            proba += p;
        }
        proba /= per_tree.len() as f64;
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

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn blobs() -> (Array2<f64>, Array1<i64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        (x, array![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_classifier() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y, 2).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions.iter().zip(y.iter()).filter(|(p, a)| p == a).count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
        assert_eq!(rf.n_trees(), 10);
    }

    #[test]
    fn test_predict_proba() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y, 3).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 3);
        for i in 0..proba.nrows() {
            let row_sum: f64 = proba.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-6, "Row {} sum: {}", i, row_sum);
            assert_eq!(proba[[i, 2]], 0.0);
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs();
        let mut a = RandomForest::new(5).with_random_state(7);
        let mut b = RandomForest::new(5).with_random_state(7);
        a.fit(&x, &y, 2).unwrap();
        b.fit(&x, &y, 2).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_from_params() {
        let mut p = ModelParams::new();
        p.insert("n_estimators".to_string(), json!(25));
        p.insert("max_depth".to_string(), json!(null));
        p.insert("criterion".to_string(), json!("entropy"));
        p.insert("bootstrap".to_string(), json!(false));
        let rf = RandomForest::from_params(&p).unwrap();
        assert_eq!(rf.n_estimators, 25);
        assert_eq!(rf.max_depth, None);
        assert_eq!(rf.criterion, Criterion::Entropy);
        assert!(!rf.bootstrap);

        p.insert("oob".to_string(), json!(true));
        assert!(RandomForest::from_params(&p).is_err());
    }
}
