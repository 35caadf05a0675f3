//! On-disk artifact layout shared by training and inference

use crate::error::{Result, RiskError};
use crate::preprocessing::{FeatureSchema, LabelEncoder, StandardScaler};
use crate::training::TrainedModel;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MODEL_FILE: &str = "best_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const LABELS_FILE: &str = "label_encoder.json";
pub const COLUMNS_FILE: &str = "encoded_columns.json";
pub const METRICS_FILE: &str = "metrics.json";

/// The fitted pieces a prediction needs
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub model: TrainedModel,
    pub scaler: StandardScaler,
    pub labels: LabelEncoder,
    pub schema: FeatureSchema,
}

/// A directory of JSON artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Write every artifact, creating the directory when needed
    pub fn save<M: Serialize>(&self, artifacts: &ArtifactSet, metrics: &M) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.write(MODEL_FILE, &artifacts.model)?;
        self.write(SCALER_FILE, &artifacts.scaler)?;
        self.write(LABELS_FILE, &artifacts.labels)?;
        self.write(COLUMNS_FILE, &artifacts.schema)?;
        self.write(METRICS_FILE, metrics)?;
        Ok(())
    }

    /// Read every artifact; any missing or unparseable file is an `ArtifactError`
    pub fn load(&self) -> Result<ArtifactSet> {
        Ok(ArtifactSet {
            model: self.read(MODEL_FILE)?,
            scaler: self.read(SCALER_FILE)?,
            labels: self.read(LABELS_FILE)?,
            schema: self.read(COLUMNS_FILE)?,
        })
    }

    /// Training summary as loose JSON
    pub fn load_metrics(&self) -> Result<serde_json::Value> {
        self.read(METRICS_FILE)
    }

    fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "Wrote artifact");
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.path(file);
        let text = fs::read_to_string(&path).map_err(|e| RiskError::ArtifactError {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| RiskError::ArtifactError {
            path,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::DecisionTree;
    use ndarray::array;
    use serde_json::json;

    fn fitted_set() -> ArtifactSet {
        let x = array![[0.0, 1.0], [0.2, 1.1], [1.0, 0.0], [1.2, 0.1]];
        let y = array![0, 0, 1, 1];
        let mut model = TrainedModel::DecisionTreeClassifier(DecisionTree::new());
        model.fit(&x, &y, 2).unwrap();
        let mut scaler = StandardScaler::new();
        scaler.fit(&x).unwrap();
        let mut labels = LabelEncoder::new();
        labels.fit(&["Alto".to_string(), "Baixo".to_string()]);
        ArtifactSet {
            model,
            scaler,
            labels,
            schema: FeatureSchema::new(vec!["a".to_string(), "b".to_string()]),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("models"));
        store.save(&fitted_set(), &json!({"model_name": "DecisionTreeClassifier"})).unwrap();

        for file in [MODEL_FILE, SCALER_FILE, LABELS_FILE, COLUMNS_FILE, METRICS_FILE] {
            assert!(store.path(file).exists(), "{} missing", file);
        }

        let loaded = store.load().unwrap();
        assert_eq!(loaded.schema.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(loaded.labels.classes(), &["Alto".to_string(), "Baixo".to_string()]);
        assert_eq!(loaded.scaler.n_features(), 2);
        assert_eq!(store.load_metrics().unwrap()["model_name"], "DecisionTreeClassifier");
    }

    #[test]
    fn test_missing_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&fitted_set(), &json!({})).unwrap();
        fs::remove_file(store.path(SCALER_FILE)).unwrap();

        match store.load() {
            Err(RiskError::ArtifactError { path, .. }) => assert!(path.ends_with(SCALER_FILE)),
            other => panic!("expected ArtifactError, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&fitted_set(), &json!({})).unwrap();
        fs::write(store.path(COLUMNS_FILE), "{not json").unwrap();
        assert!(matches!(store.load(), Err(RiskError::ArtifactError { .. })));
    }
}
