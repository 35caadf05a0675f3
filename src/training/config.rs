//! Training configuration

use crate::error::{Result, RiskError};
use crate::preprocessing::PreprocessingConfig;
use super::decision_tree::DecisionTree;
use super::linear_models::LogisticRegression;
use super::models::TrainedModel;
use super::params::{ModelParams, ParamGrid};
use super::random_forest::RandomForest;
use super::svm::SVC;
use super::xgboost::XGBClassifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported classifiers, by the names used in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelName {
    RandomForestClassifier,
    DecisionTreeClassifier,
    XGBClassifier,
    LogisticRegression,
    SVC,
}

impl ModelName {
    pub const ALL: [ModelName; 5] = [
        ModelName::RandomForestClassifier,
        ModelName::DecisionTreeClassifier,
        ModelName::XGBClassifier,
        ModelName::LogisticRegression,
        ModelName::SVC,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::RandomForestClassifier => RandomForest::NAME,
            ModelName::DecisionTreeClassifier => DecisionTree::NAME,
            ModelName::XGBClassifier => XGBClassifier::NAME,
            ModelName::LogisticRegression => LogisticRegression::NAME,
            ModelName::SVC => SVC::NAME,
        }
    }

    /// Unfitted model configured from `params`
    pub fn build(&self, params: &ModelParams) -> Result<TrainedModel> {
        Ok(match self {
            ModelName::RandomForestClassifier => {
                TrainedModel::RandomForestClassifier(RandomForest::from_params(params)?)
            }
            ModelName::DecisionTreeClassifier => {
                TrainedModel::DecisionTreeClassifier(DecisionTree::from_params(params)?)
            }
            ModelName::XGBClassifier => TrainedModel::XGBClassifier(XGBClassifier::from_params(params)?),
            ModelName::LogisticRegression => {
                TrainedModel::LogisticRegression(LogisticRegression::from_params(params)?)
            }
            ModelName::SVC => TrainedModel::SVC(SVC::from_params(params)?),
        })
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelName {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self> {
        ModelName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| RiskError::ConfigError(format!("Unknown model_name '{}'", s)))
    }
}

fn default_cv_folds() -> usize {
    5
}

/// Training run configuration, read from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Classifier to train
    pub model_name: ModelName,

    /// CSV dataset
    pub data_path: PathBuf,

    /// Directory that receives the artifacts
    pub save_dir: PathBuf,

    /// Candidate values per parameter; enables grid search when non-empty
    #[serde(default)]
    pub hyperparameter_grid: Option<ParamGrid>,

    /// Parameters used when no grid search runs
    #[serde(default)]
    pub base_params: Option<ModelParams>,

    /// Parameters applied under every grid candidate and under `base_params`
    #[serde(default)]
    pub static_params: Option<ModelParams>,

    /// Folds for grid-search cross-validation
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,

    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
}

impl TrainingConfig {
    /// Create a configuration with defaults for everything but the essentials
    pub fn new(model_name: ModelName, data_path: impl Into<PathBuf>, save_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_name,
            data_path: data_path.into(),
            save_dir: save_dir.into(),
            hyperparameter_grid: None,
            base_params: None,
            static_params: None,
            cv_folds: default_cv_folds(),
            preprocessing: PreprocessingConfig::default(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RiskError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.hyperparameter_grid = Some(grid);
        self
    }

    pub fn with_base_params(mut self, params: ModelParams) -> Self {
        self.base_params = Some(params);
        self
    }

    pub fn with_static_params(mut self, params: ModelParams) -> Self {
        self.static_params = Some(params);
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    /// Grid with at least one non-empty candidate list
    pub fn active_grid(&self) -> Option<&ParamGrid> {
        self.hyperparameter_grid
            .as_ref()
            .filter(|grid| grid.values().any(|values| !values.is_empty()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(RiskError::invalid_param("cv_folds", self.cv_folds, "must be at least 2"));
        }
        self.preprocessing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YAML: &str = r#"
model_name: RandomForestClassifier
data_path: data/raw/dataset.csv
save_dir: models
hyperparameter_grid:
  n_estimators: [50, 100]
  max_depth: [null, 10]
static_params:
  random_state: 42
"#;

    #[test]
    fn test_parse_yaml() {
        let config = TrainingConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.model_name, ModelName::RandomForestClassifier);
        assert_eq!(config.cv_folds, 5);
        let grid = config.active_grid().unwrap();
        assert_eq!(grid["max_depth"], vec![json!(null), json!(10)]);
        assert_eq!(config.static_params.unwrap()["random_state"], json!(42));
        assert_eq!(config.preprocessing.target_column, "Risco_Doenca");
    }

    #[test]
    fn test_unknown_model_name_rejected() {
        let yaml = "model_name: KNeighborsClassifier\ndata_path: a.csv\nsave_dir: out\n";
        assert!(matches!(
            TrainingConfig::from_yaml_str(yaml),
            Err(RiskError::ConfigError(_))
        ));
    }

    #[test]
    fn test_empty_grid_is_inactive() {
        let yaml = "model_name: SVC\ndata_path: a.csv\nsave_dir: out\nhyperparameter_grid: {}\n";
        let config = TrainingConfig::from_yaml_str(yaml).unwrap();
        assert!(config.active_grid().is_none());
    }

    #[test]
    fn test_model_name_roundtrip() {
        for name in ModelName::ALL {
            assert_eq!(name.as_str().parse::<ModelName>().unwrap(), name);
            assert!(name.build(&ModelParams::new()).is_ok());
        }
    }

    #[test]
    fn test_invalid_cv_folds() {
        let config = TrainingConfig::new(ModelName::SVC, "a.csv", "out").with_cv_folds(1);
        assert!(config.validate().is_err());
    }
}
