//! Hyperparameter maps as they appear in the training YAML

use crate::error::{Result, RiskError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameter name → value, in the scikit-learn/XGBoost naming used by configs
pub type ModelParams = BTreeMap<String, Value>;

/// Parameter name → candidate values
pub type ParamGrid = BTreeMap<String, Vec<Value>>;

/// Execution hints accepted for every model and otherwise ignored
const IGNORED_KEYS: &[&str] = &["n_jobs", "verbose"];

pub(crate) fn is_ignored(key: &str) -> bool {
    IGNORED_KEYS.contains(&key)
}

pub(crate) fn unknown(model: &str, key: &str, value: &Value) -> RiskError {
    RiskError::invalid_param(key, value, format!("not a {} parameter", model))
}

/// `base` overlaid by `overlay`; keys in `overlay` win
pub fn merge_params(base: &ModelParams, overlay: &ModelParams) -> ModelParams {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Cartesian product of a grid, in key order with the last key varying fastest
pub fn expand_grid(grid: &ParamGrid) -> Vec<ModelParams> {
    let mut candidates = vec![ModelParams::new()];
    for (key, values) in grid {
        if values.is_empty() {
            continue;
        }
        candidates = candidates
            .into_iter()
            .flat_map(|partial| {
                values.iter().map(move |value| {
                    let mut next = partial.clone();
                    next.insert(key.clone(), value.clone());
                    next
                })
            })
            .collect();
    }
    candidates
}

pub(crate) fn as_f64(key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| RiskError::invalid_param(key, value, "expected a number"))
}

pub(crate) fn as_positive_f64(key: &str, value: &Value) -> Result<f64> {
    let v = as_f64(key, value)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(RiskError::invalid_param(key, value, "must be positive"))
    }
}

pub(crate) fn as_non_negative_f64(key: &str, value: &Value) -> Result<f64> {
    let v = as_f64(key, value)?;
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(RiskError::invalid_param(key, value, "must be non-negative"))
    }
}

pub(crate) fn as_fraction(key: &str, value: &Value) -> Result<f64> {
    let v = as_f64(key, value)?;
    if v > 0.0 && v <= 1.0 {
        Ok(v)
    } else {
        Err(RiskError::invalid_param(key, value, "must be in (0, 1]"))
    }
}

pub(crate) fn as_usize(key: &str, value: &Value) -> Result<usize> {
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| RiskError::invalid_param(key, value, "expected a non-negative integer"))
}

/// Integer of at least `min`
pub(crate) fn as_usize_min(key: &str, value: &Value, min: usize) -> Result<usize> {
    let v = as_usize(key, value)?;
    if v >= min {
        Ok(v)
    } else {
        Err(RiskError::invalid_param(key, value, format!("must be at least {}", min)))
    }
}

/// `null` means "unbounded"
pub(crate) fn as_opt_usize(key: &str, value: &Value) -> Result<Option<usize>> {
    if value.is_null() {
        Ok(None)
    } else {
        as_usize_min(key, value, 1).map(Some)
    }
}

pub(crate) fn as_u64(key: &str, value: &Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| RiskError::invalid_param(key, value, "expected a non-negative integer"))
}

pub(crate) fn as_bool(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| RiskError::invalid_param(key, value, "expected true or false"))
}

pub(crate) fn as_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| RiskError::invalid_param(key, value, "expected a string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_grid_order() {
        let mut grid = ParamGrid::new();
        grid.insert("a".to_string(), vec![json!(1), json!(2)]);
        grid.insert("b".to_string(), vec![json!("x"), json!("y")]);

        let candidates = expand_grid(&grid);
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0]["a"], json!(1));
        assert_eq!(candidates[0]["b"], json!("x"));
        assert_eq!(candidates[1]["b"], json!("y"));
        assert_eq!(candidates[3]["a"], json!(2));
    }

    #[test]
    fn test_empty_grid_yields_single_candidate() {
        assert_eq!(expand_grid(&ParamGrid::new()), vec![ModelParams::new()]);
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = ModelParams::new();
        base.insert("max_depth".to_string(), json!(3));
        base.insert("random_state".to_string(), json!(42));
        let mut overlay = ModelParams::new();
        overlay.insert("max_depth".to_string(), json!(8));

        let merged = merge_params(&base, &overlay);
        assert_eq!(merged["max_depth"], json!(8));
        assert_eq!(merged["random_state"], json!(42));
    }

    #[test]
    fn test_value_readers() {
        assert_eq!(as_opt_usize("max_depth", &Value::Null).unwrap(), None);
        assert_eq!(as_opt_usize("max_depth", &json!(4)).unwrap(), Some(4));
        assert!(as_usize("n_estimators", &json!(-1)).is_err());
        assert!(as_usize("n_estimators", &json!(1.5)).is_err());
        assert!(as_fraction("subsample", &json!(0.0)).is_err());
        assert_eq!(as_f64("C", &json!(2)).unwrap(), 2.0);
        assert!(is_ignored("n_jobs"));
        assert!(!is_ignored("max_depth"));
    }
}
