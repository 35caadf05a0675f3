//! Preprocessing configuration

use serde::{Deserialize, Serialize};

/// Configuration for data preparation.
///
/// Defaults follow the patient dataset layout: `ID` identifier, `Risco_Doenca`
/// target, three numeric columns that arrive as free text, and the
/// `Agua_Litros` column whose zeros are treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Target column holding the risk level
    pub target_column: String,

    /// Identifier column, dropped when present
    pub id_column: String,

    /// Columns coerced to numbers before cleaning; unparseable values drop the row
    pub coerce_columns: Vec<String>,

    /// Column whose zero entries are replaced with the median of positive values
    pub zero_repair_column: Option<String>,

    /// IQR multiplier for outlier bounds
    pub iqr_factor: f64,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Seed shared by the split and the oversampler
    pub random_state: u64,

    /// Neighbours considered by SMOTE
    pub smote_k_neighbors: usize,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_column: "Risco_Doenca".to_string(),
            id_column: "ID".to_string(),
            coerce_columns: vec![
                "Calorias".to_string(),
                "Colesterol".to_string(),
                "Passos_Diarios".to_string(),
            ],
            zero_repair_column: Some("Agua_Litros".to_string()),
            iqr_factor: 1.5,
            test_size: 0.2,
            random_state: 42,
            smote_k_neighbors: 5,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    /// Builder method to set the columns coerced to numbers
    pub fn with_coerce_columns(mut self, columns: &[&str]) -> Self {
        self.coerce_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Builder method to set (or disable) the zero-repair column
    pub fn with_zero_repair(mut self, column: Option<&str>) -> Self {
        self.zero_repair_column = column.map(str::to_string);
        self
    }

    /// Builder method to set the IQR factor
    pub fn with_iqr_factor(mut self, factor: f64) -> Self {
        self.iqr_factor = factor;
        self
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::RiskError;

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(RiskError::invalid_param(
                "test_size",
                self.test_size,
                "must be in (0, 1)",
            ));
        }
        if !(self.iqr_factor >= 0.0) {
            return Err(RiskError::invalid_param(
                "iqr_factor",
                self.iqr_factor,
                "must be non-negative",
            ));
        }
        if self.smote_k_neighbors == 0 {
            return Err(RiskError::invalid_param(
                "smote_k_neighbors",
                self.smote_k_neighbors,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreprocessingConfig::default();
        assert_eq!(config.target_column, "Risco_Doenca");
        assert_eq!(config.coerce_columns.len(), 3);
        assert_eq!(config.zero_repair_column.as_deref(), Some("Agua_Litros"));
        assert_eq!(config.random_state, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PreprocessingConfig::new()
            .with_target("label")
            .with_coerce_columns(&["a"])
            .with_zero_repair(None)
            .with_iqr_factor(3.0)
            .with_test_size(0.25);

        assert_eq!(config.target_column, "label");
        assert_eq!(config.coerce_columns, vec!["a".to_string()]);
        assert!(config.zero_repair_column.is_none());
        assert_eq!(config.iqr_factor, 3.0);
        assert_eq!(config.test_size, 0.25);
    }

    #[test]
    fn test_invalid_test_size() {
        let config = PreprocessingConfig::new().with_test_size(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PreprocessingConfig = serde_yaml::from_str("iqr_factor: 2.0").unwrap();
        assert_eq!(config.iqr_factor, 2.0);
        assert_eq!(config.target_column, "Risco_Doenca");
    }
}
