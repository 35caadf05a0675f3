//! Training-data preparation pipeline
//!
//! Clean → encode → stratified split → SMOTE (train only) → standard scaling.

use crate::error::{Result, RiskError};
use crate::synthetic::{Sampler, SMOTE};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use super::cleaner::{CleaningReport, DataCleaner};
use super::encoder::{
    column_as_strings, partition_feature_columns, FeatureSchema, LabelEncoder, OneHotEncoder,
};
use super::scaler::StandardScaler;
use super::split::stratified_split;
use super::PreprocessingConfig;

/// Everything the trainer needs, plus the fitted artifacts inference reuses
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Resampled and scaled training features
    pub x_train: Array2<f64>,
    /// Scaled held-out features (never resampled)
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub schema: FeatureSchema,
    pub labels: LabelEncoder,
    pub scaler: StandardScaler,
    pub cleaning: CleaningReport,
    /// Synthetic rows added per class, ascending class code
    pub n_synthetic: Vec<usize>,
}

/// Runs the deterministic preparation sequence on a raw patient frame
#[derive(Debug, Clone, Default)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
}

impl DataPreprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Load a CSV and prepare it
    pub fn prepare_csv(&self, path: &Path) -> Result<PreparedData> {
        let df = load_csv(path)?;
        info!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded dataset");
        self.prepare(&df)
    }

    pub fn prepare(&self, df: &DataFrame) -> Result<PreparedData> {
        let start = Instant::now();
        self.config.validate()?;
        let target = self.config.target_column.as_str();

        if df.column(target).is_err() {
            return Err(RiskError::FeatureNotFound(target.to_string()));
        }

        let (clean, cleaning) = DataCleaner::new(&self.config).clean(df)?;
        if clean.height() == 0 {
            return Err(RiskError::DataError("No rows left after cleaning".to_string()));
        }

        let raw_labels = column_as_strings(&clean, target)?;
        let features = clean.drop(target)?;

        let (numeric, categorical) = partition_feature_columns(&features, target);
        let mut encoder = OneHotEncoder::new();
        let encoded = encoder.fit_transform(&features, &categorical)?;
        let schema = encoder.schema(&numeric)?;
        let x = schema.align(&encoded)?;

        let mut labels = LabelEncoder::new();
        let y = labels.fit_transform(&raw_labels)?;
        if labels.n_classes() < 2 {
            return Err(RiskError::ValidationError(format!(
                "Target '{}' has {} class(es); need at least 2",
                target,
                labels.n_classes()
            )));
        }

        info!(
            features = schema.len(),
            numeric = numeric.len(),
            categorical = categorical.len(),
            classes = ?labels.classes(),
            "Encoded features and target"
        );

        let split = stratified_split(&x, &y, self.config.test_size, self.config.random_state)?;
        info!(
            train = split.x_train.nrows(),
            test = split.x_test.nrows(),
            "Split data (stratified)"
        );

        let mut smote = SMOTE::new()
            .with_k_neighbors(self.config.smote_k_neighbors)
            .with_seed(self.config.random_state);
        let resampled = smote.fit_resample(&split.x_train, &split.y_train)?;
        info!(
            before = split.x_train.nrows(),
            after = resampled.x.nrows(),
            synthetic = ?resampled.n_synthetic,
            "Applied SMOTE to training split"
        );

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&resampled.x)?;
        let x_test = scaler.transform(&split.x_test)?;

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Data preparation complete");

        Ok(PreparedData {
            x_train,
            x_test,
            y_train: resampled.y,
            y_test: split.y_test,
            schema,
            labels,
            scaler,
            cleaning,
            n_synthetic: resampled.n_synthetic,
        })
    }
}

/// Cell values read as missing, the same set pandas treats as NA by default
pub const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Read a CSV with a header row.
///
/// Empty cells and any of [`NA_TOKENS`] load as null, so a numeric column with
/// a few missing markers stays numeric. The whole file is scanned for type
/// inference so a stray non-numeric value late in a column turns the column
/// into text instead of failing the read.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(NA_TOKENS.iter().map(|&token| token.into()).collect());
    let df = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::class_counts;

    fn frame() -> DataFrame {
        let n = 60;
        let age: Vec<f64> = (0..n).map(|i| 20.0 + (i % 40) as f64).collect();
        let chol: Vec<f64> = (0..n).map(|i| 150.0 + (i * 7 % 100) as f64).collect();
        let smoker: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "Sim" } else { "Não" }).collect();
        let risk: Vec<&str> = (0..n)
            .map(|i| match i % 6 {
                0 => "Alto",
                1 | 2 => "Moderado",
                _ => "Baixo",
            })
            .collect();
        df!(
            "age" => age,
            "chol" => chol,
            "smoker" => smoker,
            "risk" => risk
        )
        .unwrap()
    }

    fn config() -> PreprocessingConfig {
        PreprocessingConfig::new()
            .with_target("risk")
            .with_coerce_columns(&["chol"])
            .with_zero_repair(None)
    }

    #[test]
    fn test_prepare_shapes() {
        let prepared = DataPreprocessor::new(config()).prepare(&frame()).unwrap();

        assert_eq!(prepared.schema.columns(), &["age", "chol", "smoker_Sim"]);
        assert_eq!(prepared.x_train.ncols(), 3);
        assert_eq!(prepared.x_test.ncols(), 3);
        assert_eq!(prepared.labels.classes(), &["Alto", "Baixo", "Moderado"]);
        assert_eq!(prepared.scaler.n_features(), 3);
    }

    #[test]
    fn test_training_split_is_balanced() {
        let prepared = DataPreprocessor::new(config()).prepare(&frame()).unwrap();
        let counts = class_counts(&prepared.y_train);
        let first = *counts.values().next().unwrap();
        assert!(counts.values().all(|&c| c == first), "counts = {:?}", counts);
    }

    #[test]
    fn test_test_split_not_resampled() {
        let prepared = DataPreprocessor::new(config()).prepare(&frame()).unwrap();
        // 60 rows: 10 Alto, 20 Moderado, 30 Baixo → 2 + 4 + 6 held out
        assert_eq!(prepared.x_test.nrows(), 12);
        let counts = class_counts(&prepared.y_test);
        assert_eq!(counts.values().copied().collect::<Vec<_>>(), vec![2, 6, 4]);
    }

    #[test]
    fn test_missing_target() {
        let result = DataPreprocessor::new(config().with_target("nope")).prepare(&frame());
        assert!(matches!(result, Err(RiskError::FeatureNotFound(_))));
    }
}
