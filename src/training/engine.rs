//! Training engine: prepare data, select and fit a model, evaluate, persist

use crate::error::Result;
use crate::inference::{ArtifactSet, ArtifactStore};
use crate::preprocessing::{CleaningReport, DataPreprocessor, PreparedData};
use super::config::TrainingConfig;
use super::grid_search::GridSearch;
use super::metrics::ClassificationReport;
use super::models::TrainedModel;
use super::params::{merge_params, ModelParams};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Summary written to `metrics.json`
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub model_name: String,
    pub best_params: ModelParams,
    /// Mean cross-validated weighted F1 of the chosen candidate; absent without a grid
    pub cv_best_score: Option<f64>,
    pub classification_report: ClassificationReport,
    pub cleaning: CleaningReport,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    /// Importance per feature column for tree-based models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<BTreeMap<String, f64>>,
    pub trained_at: DateTime<Utc>,
}

/// Result of a complete training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub summary: TrainingSummary,
}

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Read the configured CSV, train, evaluate and write every artifact to `save_dir`
    pub fn run(&self) -> Result<TrainingOutcome> {
        self.config.validate()?;
        let start = Instant::now();
        info!(
            model = %self.config.model_name,
            data = %self.config.data_path.display(),
            "Starting training run"
        );

        let preprocessor = DataPreprocessor::new(self.config.preprocessing.clone());
        let data = preprocessor.prepare_csv(&self.config.data_path)?;
        let outcome = self.fit_prepared(&data)?;

        let store = ArtifactStore::new(&self.config.save_dir);
        store.save(
            &ArtifactSet {
                model: outcome.model.clone(),
                scaler: data.scaler.clone(),
                labels: data.labels.clone(),
                schema: data.schema.clone(),
            },
            &outcome.summary,
        )?;

        info!(
            save_dir = %store.dir().display(),
            accuracy = outcome.summary.classification_report.accuracy,
            weighted_f1 = outcome.summary.classification_report.weighted_f1(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Training run complete"
        );
        Ok(outcome)
    }

    /// Train and evaluate on already prepared data without touching the filesystem
    pub fn fit_prepared(&self, data: &PreparedData) -> Result<TrainingOutcome> {
        let n_classes = data.labels.n_classes();
        let static_params = self.config.static_params.clone().unwrap_or_default();

        let (model, best_params, cv_best_score) = match self.config.active_grid() {
            Some(grid) => {
                let result = GridSearch::new(self.config.model_name, grid.clone())
                    .with_static_params(static_params)
                    .with_cv_folds(self.config.cv_folds)
                    .fit(&data.x_train, &data.y_train, n_classes)?;
                (result.best_model, result.best_params, Some(result.best_score))
            }
            None => {
                let base = self.config.base_params.clone().unwrap_or_default();
                let params = merge_params(&static_params, &base);
                info!(model = %self.config.model_name, params = ?params, "Fitting without grid search");
                let mut model = self.config.model_name.build(&params)?;
                model.fit(&data.x_train, &data.y_train, n_classes)?;
                (model, params, None)
            }
        };

        let y_pred = model.predict(&data.x_test)?;
        let report = ClassificationReport::compute(&data.y_test, &y_pred, data.labels.classes())?;
        info!("Held-out evaluation:\n{}", report);

        let feature_importances = model.feature_importances().map(|values| {
            data.schema
                .columns()
                .iter()
                .cloned()
                .zip(values.iter().copied())
                .collect::<BTreeMap<_, _>>()
        });

        let summary = TrainingSummary {
            model_name: self.config.model_name.to_string(),
            best_params,
            cv_best_score,
            classification_report: report,
            cleaning: data.cleaning.clone(),
            n_train: data.x_train.nrows(),
            n_test: data.x_test.nrows(),
            n_features: data.schema.len(),
            feature_importances,
            trained_at: Utc::now(),
        };
        Ok(TrainingOutcome { model, summary })
    }
}
