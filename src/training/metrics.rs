//! Classification metrics

use crate::error::{Result, RiskError};
use ndarray::Array1;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision, recall, F1 and support for one class or one average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class and averaged metrics for a labelled prediction set.
///
/// Undefined ratios (no predictions or no samples of a class) count as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<String>,
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build from class codes; `classes[k]` names code `k`
    pub fn compute(y_true: &Array1<i64>, y_pred: &Array1<i64>, classes: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(RiskError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let n_classes = classes.len();
        let mut tp = vec![0usize; n_classes];
        let mut predicted = vec![0usize; n_classes];
        let mut support = vec![0usize; n_classes];

        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            let (t, p) = (t as usize, p as usize);
            if t >= n_classes || p >= n_classes {
                return Err(RiskError::ValidationError(format!(
                    "Class code outside 0..{}",
                    n_classes
                )));
            }
            support[t] += 1;
            predicted[p] += 1;
            if t == p {
                tp[t] += 1;
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let per_class: Vec<ClassMetrics> = (0..n_classes)
            .map(|k| {
                let precision = ratio(tp[k], predicted[k]);
                let recall = ratio(tp[k], support[k]);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics { precision, recall, f1_score, support: support[k] }
            })
            .collect();

        let total: usize = support.iter().sum();
        let accuracy = ratio(tp.iter().sum(), total);
        let average = |weight: &dyn Fn(&ClassMetrics) -> f64, norm: f64| ClassMetrics {
            precision: per_class.iter().map(|m| weight(m) * m.precision).sum::<f64>() / norm,
            recall: per_class.iter().map(|m| weight(m) * m.recall).sum::<f64>() / norm,
            f1_score: per_class.iter().map(|m| weight(m) * m.f1_score).sum::<f64>() / norm,
            support: total,
        };
        let macro_avg = average(&|_| 1.0, n_classes.max(1) as f64);
        let weighted_avg = average(&|m| m.support as f64, total.max(1) as f64);

        Ok(Self {
            classes: classes.to_vec(),
            per_class,
            accuracy,
            macro_avg,
            weighted_avg,
        })
    }

    pub fn weighted_f1(&self) -> f64 {
        self.weighted_avg.f1_score
    }

    pub fn class(&self, name: &str) -> Option<&ClassMetrics> {
        self.classes.iter().position(|c| c == name).map(|k| &self.per_class[k])
    }
}

/// Support-weighted F1 over class codes `0..n_classes`
pub fn weighted_f1_score(y_true: &Array1<i64>, y_pred: &Array1<i64>, n_classes: usize) -> Result<f64> {
    let names: Vec<String> = (0..n_classes).map(|k| k.to_string()).collect();
    Ok(ClassificationReport::compute(y_true, y_pred, &names)?.weighted_f1())
}

/// Serialized in the familiar `{"<class>": {...}, "accuracy", "macro avg", "weighted avg"}` layout
impl Serialize for ClassificationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len() + 3))?;
        for (name, metrics) in self.classes.iter().zip(&self.per_class) {
            map.serialize_entry(name, metrics)?;
        }
        map.serialize_entry("accuracy", &self.accuracy)?;
        map.serialize_entry("macro avg", &self.macro_avg)?;
        map.serialize_entry("weighted avg", &self.weighted_avg)?;
        map.end()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(String::len)
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(f, "{:>w$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support", w = width)?;
        writeln!(f)?;
        for (name, m) in self.classes.iter().zip(&self.per_class) {
            writeln!(
                f,
                "{:>w$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1_score, m.support,
                w = width
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>w$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.weighted_avg.support,
            w = width
        )?;
        for (label, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>w$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, m.precision, m.recall, m.f1_score, m.support,
                w = width
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["Alto".to_string(), "Baixo".to_string(), "Moderado".to_string()]
    }

    #[test]
    fn test_report_values() {
        let y_true = array![0, 0, 1, 1, 1, 2];
        let y_pred = array![0, 1, 1, 1, 2, 2];
        let report = ClassificationReport::compute(&y_true, &y_pred, &names()).unwrap();

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        let alto = report.class("Alto").unwrap();
        assert_eq!(alto.precision, 1.0);
        assert_eq!(alto.recall, 0.5);
        assert_eq!(alto.support, 2);
        let moderado = report.class("Moderado").unwrap();
        assert_eq!(moderado.precision, 0.5);
        assert_eq!(moderado.recall, 1.0);

        // weighted F1 = (2·2/3 + 3·2/3 + 1·2/3) / 6
        assert!((report.weighted_f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_counts_as_zero() {
        let y_true = array![0, 0, 1];
        let y_pred = array![0, 0, 0];
        let f1 = weighted_f1_score(&y_true, &y_pred, 2).unwrap();
        // class 1 never predicted: precision 0, f1 0
        assert!((f1 - (2.0 * 0.8) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_serialized_layout() {
        let y = array![0, 1, 2];
        let report = ClassificationReport::compute(&y, &y, &names()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Baixo"]["f1-score"], 1.0);
        assert_eq!(json["accuracy"], 1.0);
        assert_eq!(json["macro avg"]["support"], 3);
        assert!(json.get("weighted avg").is_some());
    }

    #[test]
    fn test_display_has_rows() {
        let y = array![0, 1, 2];
        let text = ClassificationReport::compute(&y, &y, &names()).unwrap().to_string();
        assert!(text.contains("Moderado"));
        assert!(text.contains("weighted avg"));
    }
}
