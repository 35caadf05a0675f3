//! Categorical encoding: one-hot features, label-encoded target, canonical schema

use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One-hot encoder producing `{column}_{level}` indicator columns.
///
/// `fit` records the sorted level set of each categorical column. `transform`
/// emits an indicator for every level present in the frame it is given, so a
/// single-row inference frame and the full training frame go through the same
/// code path; [`FeatureSchema::align`] then selects the canonical columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    levels: BTreeMap<String, Vec<String>>,
    columns: Vec<String>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the level set of each categorical column
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.levels.clear();
        for name in columns {
            let values = column_as_strings(df, name)?;
            let levels: BTreeSet<String> = values.into_iter().collect();
            self.levels.insert(name.clone(), levels.into_iter().collect());
        }
        self.columns = columns.to_vec();
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace each fitted categorical column with its indicator columns
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(RiskError::ModelNotFitted);
        }
        one_hot_columns(df, &self.columns)
    }

    /// Fit on `columns`, then transform
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Canonical schema: numeric columns in order, then each categorical
    /// column's levels with the first (reference) level dropped.
    pub fn schema(&self, numeric_columns: &[String]) -> Result<FeatureSchema> {
        if !self.is_fitted {
            return Err(RiskError::ModelNotFitted);
        }
        let mut columns = numeric_columns.to_vec();
        for name in &self.columns {
            if let Some(levels) = self.levels.get(name) {
                columns.extend(levels.iter().skip(1).map(|level| indicator_column(name, level)));
            }
        }
        Ok(FeatureSchema::new(columns))
    }
}

/// Replace `columns` with `{column}_{level}` indicators for every level present in `df`.
///
/// Other columns keep their position; indicators are appended in `columns`
/// order with levels sorted. Columns absent from `df` are skipped.
pub fn one_hot_columns(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut out: Vec<Column> = df
        .get_columns()
        .iter()
        .filter(|c| !columns.iter().any(|name| name == c.name().as_str()))
        .cloned()
        .collect();

    for name in columns {
        if df.column(name).is_err() {
            continue;
        }
        let values = column_as_strings(df, name)?;
        let observed: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        for level in observed {
            let indicator: Vec<i32> = values
                .iter()
                .map(|v| i32::from(v.as_str() == level))
                .collect();
            out.push(Series::new(indicator_column(name, level).into(), indicator).into());
        }
    }

    Ok(DataFrame::new(out)?)
}

/// One-hot every non-numeric column of `df`, keeping all levels
pub fn get_dummies(df: &DataFrame) -> Result<DataFrame> {
    let (_, categorical) = partition_feature_columns(df, "");
    one_hot_columns(df, &categorical)
}

fn indicator_column(column: &str, level: &str) -> String {
    format!("{}_{}", column, level)
}

/// Ordered feature columns the model was trained on.
///
/// Persisted as a bare JSON list of column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reindex `df` to exactly the schema columns, in schema order.
    ///
    /// Columns missing from `df` are zero-filled and columns not in the schema
    /// are ignored, so the result always has `self.len()` columns.
    pub fn align(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let mut out = Array2::zeros((n_rows, self.columns.len()));
        let mut missing = 0usize;

        for (j, name) in self.columns.iter().enumerate() {
            let Ok(column) = df.column(name) else {
                missing += 1;
                continue;
            };
            let values = column.cast(&DataType::Float64)?;
            for (i, v) in values.f64()?.into_iter().enumerate() {
                out[[i, j]] = v.unwrap_or(0.0);
            }
        }

        if missing > 0 {
            debug!(missing, total = self.columns.len(), "Zero-filled columns absent from input");
        }
        Ok(out)
    }
}

/// Bidirectional mapping between class names and integer codes.
///
/// Classes are sorted; a class's code is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, labels: &[String]) -> &mut Self {
        let unique: BTreeSet<&String> = labels.iter().collect();
        self.classes = unique.into_iter().cloned().collect();
        self
    }

    pub fn transform(&self, labels: &[String]) -> Result<Array1<i64>> {
        labels
            .iter()
            .map(|label| {
                self.code(label)
                    .map(|c| c as i64)
                    .ok_or_else(|| RiskError::InvalidInput(format!("Unknown class label '{}'", label)))
            })
            .collect::<Result<Vec<i64>>>()
            .map(Array1::from_vec)
    }

    pub fn fit_transform(&mut self, labels: &[String]) -> Result<Array1<i64>> {
        self.fit(labels);
        self.transform(labels)
    }

    /// Decode one class code
    pub fn inverse_transform(&self, code: usize) -> Result<&str> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| RiskError::InferenceError(format!("Class code {} out of range", code)))
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Split feature columns into numeric and categorical, in frame order,
/// skipping `exclude`.
pub fn partition_feature_columns(df: &DataFrame, exclude: &str) -> (Vec<String>, Vec<String>) {
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    for column in df.get_columns() {
        let name = column.name().to_string();
        if name == exclude {
            continue;
        }
        match column.dtype() {
            DataType::String | DataType::Boolean => categorical.push(name),
            dtype if dtype.is_primitive_numeric() => numeric.push(name),
            _ => categorical.push(name),
        }
    }
    (numeric, categorical)
}

/// Read a column as owned strings; nulls become empty strings
pub fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| RiskError::FeatureNotFound(name.to_string()))?
        .cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}
