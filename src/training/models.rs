//! Trained model dispatch and shared classifier helpers

use crate::error::{Result, RiskError};
use super::config::ModelName;
use super::decision_tree::DecisionTree;
use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use super::svm::SVC;
use super::xgboost::XGBClassifier;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model", content = "state")]
pub enum TrainedModel {
    RandomForestClassifier(RandomForest),
    DecisionTreeClassifier(DecisionTree),
    XGBClassifier(XGBClassifier),
    LogisticRegression(LogisticRegression),
    SVC(SVC),
}

impl TrainedModel {
    pub fn name(&self) -> ModelName {
        match self {
            TrainedModel::RandomForestClassifier(_) => ModelName::RandomForestClassifier,
            TrainedModel::DecisionTreeClassifier(_) => ModelName::DecisionTreeClassifier,
            TrainedModel::XGBClassifier(_) => ModelName::XGBClassifier,
            TrainedModel::LogisticRegression(_) => ModelName::LogisticRegression,
            TrainedModel::SVC(_) => ModelName::SVC,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<()> {
        match self {
            TrainedModel::RandomForestClassifier(m) => m.fit(x, y, n_classes).map(|_| ()),
            TrainedModel::DecisionTreeClassifier(m) => m.fit(x, y, n_classes).map(|_| ()),
            TrainedModel::XGBClassifier(m) => m.fit(x, y, n_classes).map(|_| ()),
            TrainedModel::LogisticRegression(m) => m.fit(x, y, n_classes).map(|_| ()),
            TrainedModel::SVC(m) => m.fit(x, y, n_classes).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        match self {
            TrainedModel::RandomForestClassifier(m) => m.predict(x),
            TrainedModel::DecisionTreeClassifier(m) => m.predict(x),
            TrainedModel::XGBClassifier(m) => m.predict(x),
            TrainedModel::LogisticRegression(m) => m.predict(x),
            TrainedModel::SVC(m) => m.predict(x),
        }
    }

    /// Per-class probabilities; columns follow class codes
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            TrainedModel::RandomForestClassifier(m) => m.predict_proba(x),
            TrainedModel::DecisionTreeClassifier(m) => m.predict_proba(x),
            TrainedModel::XGBClassifier(m) => m.predict_proba(x),
            TrainedModel::LogisticRegression(m) => m.predict_proba(x),
            TrainedModel::SVC(m) => m.predict_proba(x),
        }
    }

    /// Input width seen during fit (0 before fitting)
    pub fn n_features(&self) -> usize {
        match self {
            TrainedModel::RandomForestClassifier(m) => m.n_features(),
            TrainedModel::DecisionTreeClassifier(m) => m.n_features(),
            TrainedModel::XGBClassifier(m) => m.n_features(),
            TrainedModel::LogisticRegression(m) => m.n_features(),
            TrainedModel::SVC(m) => m.n_features(),
        }
    }

    /// Normalized per-feature importances for tree ensembles; `None` for
    /// linear and kernel models or before fitting
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            TrainedModel::RandomForestClassifier(m) => m.feature_importances().cloned(),
            TrainedModel::DecisionTreeClassifier(m) => m.feature_importances().cloned(),
            TrainedModel::XGBClassifier(m) => m.feature_importances(),
            TrainedModel::LogisticRegression(_) | TrainedModel::SVC(_) => None,
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            TrainedModel::RandomForestClassifier(m) => m.n_classes(),
            TrainedModel::DecisionTreeClassifier(m) => m.n_classes(),
            TrainedModel::XGBClassifier(m) => m.n_classes(),
            TrainedModel::LogisticRegression(m) => m.n_classes(),
            TrainedModel::SVC(m) => m.n_classes(),
        }
    }
}

/// Shape and label-range checks shared by every `fit`
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(RiskError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(RiskError::TrainingError("Training set is empty".to_string()));
    }
    if n_classes < 2 {
        return Err(RiskError::TrainingError(format!(
            "Need at least 2 classes, got {}",
            n_classes
        )));
    }
    if let Some(&bad) = y.iter().find(|&&c| c < 0 || c as usize >= n_classes) {
        return Err(RiskError::TrainingError(format!(
            "Class code {} outside 0..{}",
            bad, n_classes
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::TrainingError("Training matrix contains NaN or infinite values".to_string()));
    }
    Ok(())
}

/// Index of the largest value; the first wins on ties
pub(crate) fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (k, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = k;
        }
    }
    best
}

pub(crate) fn argmax_rows(scores: &Array2<f64>) -> Array1<i64> {
    scores.rows().into_iter().map(|row| argmax(row) as i64).collect()
}

/// Row-wise softmax with max subtraction
pub(crate) fn softmax_rows(scores: &Array2<f64>) -> Array2<f64> {
    let mut out = scores.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row /= sum;
        }
    }
    out
}

/// Indicator matrix of class codes
pub(crate) fn one_hot_targets(y: &Array1<i64>, n_classes: usize) -> Array2<f64> {
    let mut targets = Array2::zeros((y.len(), n_classes));
    for (i, &c) in y.iter().enumerate() {
        targets[[i, c as usize]] = 1.0;
    }
    targets
}
