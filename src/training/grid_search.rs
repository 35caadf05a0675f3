//! Exhaustive grid search with cross-validated weighted F1

use crate::error::{Result, RiskError};
use super::config::ModelName;
use super::cross_validation::{CVSplit, CrossValidator};
use super::metrics::weighted_f1_score;
use super::models::TrainedModel;
use super::params::{expand_grid, merge_params, ModelParams, ParamGrid};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Mean and per-fold scores of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ModelParams,
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Outcome of a grid search; `best_model` is refit on all training rows
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: ModelParams,
    pub best_score: f64,
    pub best_model: TrainedModel,
    pub candidates: Vec<CandidateScore>,
}

/// Grid search over one model family
#[derive(Debug, Clone)]
pub struct GridSearch {
    model: ModelName,
    grid: ParamGrid,
    static_params: ModelParams,
    cv_folds: usize,
}

impl GridSearch {
    pub fn new(model: ModelName, grid: ParamGrid) -> Self {
        Self {
            model,
            grid,
            static_params: ModelParams::new(),
            cv_folds: 5,
        }
    }

    /// Parameters applied under every candidate; grid values win on conflict
    pub fn with_static_params(mut self, params: ModelParams) -> Self {
        self.static_params = params;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Full parameter sets in evaluation order
    pub fn candidates(&self) -> Vec<ModelParams> {
        expand_grid(&self.grid)
            .iter()
            .map(|point| merge_params(&self.static_params, point))
            .collect()
    }

    /// Score every candidate on every fold, then refit the best on all rows.
    ///
    /// Ties keep the earliest candidate.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<i64>, n_classes: usize) -> Result<GridSearchResult> {
        let start = Instant::now();
        let candidates = self.candidates();

        // Fail on bad parameter names or values before any training
        for params in &candidates {
            self.model.build(params)?;
        }

        let splits = CrossValidator::new(self.cv_folds).split(y)?;

        info!(
            model = %self.model,
            candidates = candidates.len(),
            folds = splits.len(),
            fits = candidates.len() * splits.len(),
            "Starting grid search"
        );

        let jobs: Vec<(usize, &CVSplit)> = (0..candidates.len())
            .flat_map(|c| splits.iter().map(move |s| (c, s)))
            .collect();

        let scores: Vec<f64> = jobs
            .par_iter()
            .map(|&(c, split)| self.score_fold(&candidates[c], split, x, y, n_classes))
            .collect::<Result<Vec<_>>>()?;

        let mut results = Vec::with_capacity(candidates.len());
        for (c, params) in candidates.into_iter().enumerate() {
            let fold_scores = scores[c * splits.len()..(c + 1) * splits.len()].to_vec();
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(candidate = c, mean_score, params = ?params, "Scored candidate");
            results.push(CandidateScore { params, mean_score, fold_scores });
        }

        let best_idx = results
            .iter()
            .enumerate()
            .fold(None, |best: Option<usize>, (i, r)| match best {
                Some(b) if results[b].mean_score >= r.mean_score => Some(b),
                _ => Some(i),
            })
            .ok_or_else(|| RiskError::TrainingError("Grid search produced no candidates".to_string()))?;

        let best_params = results[best_idx].params.clone();
        let best_score = results[best_idx].mean_score;
        let mut best_model = self.model.build(&best_params)?;
        best_model.fit(x, y, n_classes)?;

        info!(
            best_score,
            best_params = ?best_params,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Grid search complete"
        );

        Ok(GridSearchResult {
            best_params,
            best_score,
            best_model,
            candidates: results,
        })
    }

    fn score_fold(
        &self,
        params: &ModelParams,
        split: &CVSplit,
        x: &Array2<f64>,
        y: &Array1<i64>,
        n_classes: usize,
    ) -> Result<f64> {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut model = self.model.build(params)?;
        model.fit(&x_train, &y_train, n_classes)?;
        let y_pred = model.predict(&x_test)?;
        weighted_f1_score(&y_test, &y_pred, n_classes)
    }
}
