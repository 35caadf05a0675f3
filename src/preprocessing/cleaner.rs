//! Data cleaning: numeric coercion, IQR trimming and zero repair

use crate::error::{Result, RiskError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::outlier::{positive_median, IqrBounds};
use super::PreprocessingConfig;

/// Rows removed while trimming one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTrim {
    pub column: String,
    pub lower: f64,
    pub upper: f64,
    pub removed: usize,
}

/// What a cleaning pass did to the frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_dropped_unparseable: usize,
    pub id_dropped: bool,
    pub trims: Vec<ColumnTrim>,
    pub zeros_repaired: usize,
    pub zero_repair_median: Option<f64>,
    pub rows_out: usize,
}

impl CleaningReport {
    /// Total rows removed by outlier trimming
    pub fn outliers_removed(&self) -> usize {
        self.trims.iter().map(|t| t.removed).sum()
    }
}

/// Applies the cleaning sequence to a raw patient frame.
#[derive(Debug, Clone)]
pub struct DataCleaner {
    coerce_columns: Vec<String>,
    id_column: String,
    target_column: String,
    zero_repair_column: Option<String>,
    iqr_factor: f64,
}

impl DataCleaner {
    pub fn new(config: &PreprocessingConfig) -> Self {
        Self {
            coerce_columns: config.coerce_columns.clone(),
            id_column: config.id_column.clone(),
            target_column: config.target_column.clone(),
            zero_repair_column: config.zero_repair_column.clone(),
            iqr_factor: config.iqr_factor,
        }
    }

    /// Run the full cleaning sequence.
    ///
    /// Steps, in order: coerce the configured columns to `Float64`, drop rows
    /// with any null or float NaN, drop the identifier column, trim every numeric feature
    /// column with IQR bounds recomputed on the already-trimmed frame, then
    /// replace zeros in the repair column with the median of its positive values.
    pub fn clean(&self, df: &DataFrame) -> Result<(DataFrame, CleaningReport)> {
        let mut report = CleaningReport {
            rows_in: df.height(),
            ..Default::default()
        };

        let mut df = nan_to_null(self.coerce_numeric(df)?)?;

        let before = df.height();
        df = df.drop_nulls::<String>(None)?;
        report.rows_dropped_unparseable = before - df.height();
        if report.rows_dropped_unparseable > 0 {
            debug!(
                rows = report.rows_dropped_unparseable,
                "Dropped rows with missing or unparseable values"
            );
        }

        if df.column(&self.id_column).is_ok() {
            df = df.drop(&self.id_column)?;
            report.id_dropped = true;
        }

        df = self.trim_outliers(df, &mut report)?;

        if let Some(column) = &self.zero_repair_column {
            df = self.repair_zeros(df, column, &mut report)?;
        }

        report.rows_out = df.height();
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            unparseable = report.rows_dropped_unparseable,
            outliers = report.outliers_removed(),
            zeros_repaired = report.zeros_repaired,
            "Numeric cleaning complete"
        );

        Ok((df, report))
    }

    fn coerce_numeric(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for name in &self.coerce_columns {
            // Non-strict cast: text that does not parse becomes null
            let coerced = df
                .column(name)
                .map_err(|_| RiskError::FeatureNotFound(name.clone()))?
                .cast(&DataType::Float64)?;
            result.with_column(coerced)?;
        }
        Ok(result)
    }

    /// Numeric feature columns in frame order
    fn numeric_columns(&self, df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|c| c.dtype().is_primitive_numeric())
            .map(|c| c.name().to_string())
            .filter(|name| *name != self.target_column)
            .collect()
    }

    fn trim_outliers(&self, mut df: DataFrame, report: &mut CleaningReport) -> Result<DataFrame> {
        for column in self.numeric_columns(&df) {
            let values = column_as_f64(&df, &column)?;
            let Some(bounds) = IqrBounds::compute(&values, self.iqr_factor) else {
                continue;
            };

            let mask: BooleanChunked = values.iter().map(|&v| bounds.contains(v)).collect();
            let before = df.height();
            df = df.filter(&mask)?;
            let removed = before - df.height();

            info!(
                column = %column,
                lower = bounds.lower,
                upper = bounds.upper,
                removed,
                "Trimmed outliers"
            );
            report.trims.push(ColumnTrim {
                column,
                lower: bounds.lower,
                upper: bounds.upper,
                removed,
            });
        }
        Ok(df)
    }

    fn repair_zeros(
        &self,
        mut df: DataFrame,
        column: &str,
        report: &mut CleaningReport,
    ) -> Result<DataFrame> {
        let values = column_as_f64(&df, column)?;
        let zeros = values.iter().filter(|&&v| v == 0.0).count();

        let Some(median) = positive_median(&values) else {
            if zeros > 0 {
                warn!(column, zeros, "No positive values to derive a median; zeros left as-is");
            }
            return Ok(df);
        };

        report.zero_repair_median = Some(median);
        if zeros == 0 {
            return Ok(df);
        }

        let repaired: Vec<f64> = values
            .into_iter()
            .map(|v| if v == 0.0 { median } else { v })
            .collect();
        df.with_column(Series::new(column.into(), repaired))?;
        report.zeros_repaired = zeros;

        debug!(column, zeros, median, "Replaced zeros with positive median");
        Ok(df)
    }
}

/// Turn NaN in every `Float64` column into null
fn nan_to_null(mut df: DataFrame) -> Result<DataFrame> {
    let float_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::Float64)
        .map(|c| c.name().to_string())
        .collect();

    for name in float_columns {
        let values = df.column(&name)?.f64()?;
        if values.is_nan().any() {
            let cleaned: Float64Chunked = values.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect();
            df.with_column(cleaned.with_name(name.as_str().into()).into_series())?;
        }
    }
    Ok(df)
}

/// Read a column as `f64`, nulls mapped to NaN
pub(crate) fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| RiskError::FeatureNotFound(name.to_string()))?
        .cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}
