//! Predictor: the loaded artifact set applied to single patient records

use crate::error::{Result, RiskError};
use crate::preprocessing::{get_dummies, FeatureSchema, LabelEncoder, StandardScaler};
use crate::training::{ModelName, TrainedModel};
use super::artifacts::{ArtifactSet, ArtifactStore};
use super::record::PatientRecord;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Decoded class and per-class probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub probabilities: BTreeMap<String, f64>,
}

impl Prediction {
    /// Probabilities as percentages with two decimals, e.g. `"72.50%"`
    pub fn percentages(&self) -> BTreeMap<String, String> {
        self.probabilities
            .iter()
            .map(|(class, &p)| (class.clone(), format_percent(p)))
            .collect()
    }
}

pub fn format_percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}

/// Static description of the loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: ModelName,
    pub classes: Vec<String>,
    pub n_features: usize,
    pub feature_columns: Vec<String>,
}

/// Read-only handle over a trained artifact set.
///
/// Share it behind an `Arc`; prediction takes `&self` and keeps no state.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: TrainedModel,
    scaler: StandardScaler,
    labels: LabelEncoder,
    schema: FeatureSchema,
}

impl Predictor {
    /// Load every artifact from `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let start = Instant::now();
        let store = ArtifactStore::new(dir.as_ref());
        let predictor = Self::from_parts(store.load()?)?;
        info!(
            dir = %store.dir().display(),
            model = %predictor.model.name(),
            features = predictor.schema.len(),
            classes = ?predictor.labels.classes(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded predictor"
        );
        Ok(predictor)
    }

    /// Assemble from in-memory artifacts, checking that their widths agree
    pub fn from_parts(artifacts: ArtifactSet) -> Result<Self> {
        let ArtifactSet { model, scaler, labels, schema } = artifacts;

        let widths = [
            ("scaler", scaler.n_features()),
            ("model", model.n_features()),
        ];
        for (what, width) in widths {
            if width != schema.len() {
                return Err(RiskError::ShapeError {
                    expected: format!("{} features (schema)", schema.len()),
                    actual: format!("{} features ({})", width, what),
                });
            }
        }
        if model.n_classes() != labels.n_classes() {
            return Err(RiskError::ShapeError {
                expected: format!("{} classes (label encoder)", labels.n_classes()),
                actual: format!("{} classes (model)", model.n_classes()),
            });
        }

        Ok(Self { model, scaler, labels, schema })
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.model.name(),
            classes: self.labels.classes().to_vec(),
            n_features: self.schema.len(),
            feature_columns: self.schema.columns().to_vec(),
        }
    }

    pub fn classes(&self) -> &[String] {
        self.labels.classes()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode, align, scale and classify one record
    pub fn predict(&self, record: &PatientRecord) -> Result<Prediction> {
        record.validate()?;
        let mut predictions = self.predict_frame(&record.to_frame()?)?;
        predictions
            .pop()
            .ok_or_else(|| RiskError::InferenceError("Model returned no prediction".to_string()))
    }

    /// Score every row of a raw frame with the dataset's column names.
    ///
    /// Categorical values outside the training levels, and columns the frame
    /// lacks, end up as zeros after alignment.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<Prediction>> {
        let encoded = get_dummies(df)?;
        let x = self.scaler.transform(&self.schema.align(&encoded)?)?;
        let proba = self.model.predict_proba(&x)?;
        let classes = self.model.predict(&x)?;

        let predictions = proba
            .rows()
            .into_iter()
            .zip(classes.iter())
            .map(|(row, &code)| {
                let label = self.labels.inverse_transform(code as usize)?.to_string();
                let probabilities = self
                    .labels
                    .classes()
                    .iter()
                    .cloned()
                    .zip(row.iter().copied())
                    .collect();
                Ok(Prediction { label, probabilities })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = predictions.len(), "Scored records");
        Ok(predictions)
    }
}
