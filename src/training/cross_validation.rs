//! Cross-validation splitters

use crate::error::{Result, RiskError};
use ndarray::Array1;
use std::collections::HashMap;

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Unshuffled stratified K-fold splitter.
///
/// Fold assignment depends only on the label sequence.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    n_splits: usize,
}

impl CrossValidator {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/test splits over the rows labelled by `y`.
    ///
    /// Labels ordered by class (classes in order of first appearance) are
    /// dealt round-robin to decide how many rows of each class every fold
    /// receives; each class then fills the folds with contiguous runs of its
    /// members in row order. Train and test indices are ascending.
    pub fn split(&self, y: &Array1<i64>) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        check_n_splits(y.len(), n_splits)?;

        let mut order: Vec<i64> = Vec::new();
        let mut members: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, &class) in y.iter().enumerate() {
            members
                .entry(class)
                .or_insert_with(|| {
                    order.push(class);
                    Vec::new()
                })
                .push(idx);
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut position = 0;
        for class in &order {
            let rows = &members[class];
            if rows.len() < n_splits {
                return Err(RiskError::ValidationError(format!(
                    "Class {} has {} member(s), fewer than n_splits = {}",
                    class,
                    rows.len(),
                    n_splits
                )));
            }

            let mut allocation = vec![0usize; n_splits];
            for offset in 0..rows.len() {
                allocation[(position + offset) % n_splits] += 1;
            }
            position += rows.len();

            let mut cursor = 0;
            for (fold, &count) in folds.iter_mut().zip(&allocation) {
                fold.extend_from_slice(&rows[cursor..cursor + count]);
                cursor += count;
            }
        }

        Ok(splits_from_folds(folds))
    }
}

fn check_n_splits(n_samples: usize, n_splits: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(RiskError::ValidationError("n_splits must be at least 2".to_string()));
    }
    if n_samples < n_splits {
        return Err(RiskError::ValidationError(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }
    Ok(())
}

fn splits_from_folds(mut folds: Vec<Vec<usize>>) -> Vec<CVSplit> {
    folds.iter_mut().for_each(|fold| fold.sort_unstable());
    (0..folds.len())
        .map(|fold_idx| {
            let mut train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            train_indices.sort_unstable();
            CVSplit {
                test_indices: folds[fold_idx].clone(),
                train_indices,
                fold_idx,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Array1<i64> {
        let mut v = vec![0i64; 50];
        v.extend(vec![1i64; 25]);
        v.extend(vec![2i64; 10]);
        Array1::from_vec(v)
    }

    #[test]
    fn test_stratified_kfold_preserves_classes() {
        let y = labels();
        let splits = CrossValidator::new(5).split(&y).unwrap();
        assert_eq!(splits.len(), 5);

        for split in &splits {
            let count = |c: i64| split.test_indices.iter().filter(|&&i| y[i] == c).count();
            assert_eq!(count(0), 10);
            assert_eq!(count(1), 5);
            assert_eq!(count(2), 2);
            assert_eq!(split.train_indices.len() + split.test_indices.len(), y.len());
        }
    }

    #[test]
    fn test_folds_are_contiguous_runs_in_row_order() {
        let y = labels();
        let splits = CrossValidator::new(5).split(&y).unwrap();
        let expected: Vec<usize> = (0..10).chain(50..55).chain(75..77).collect();
        assert_eq!(splits[0].test_indices, expected);
        assert!(splits[0].train_indices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(splits[0].train_indices[..3], [10, 11, 12]);
        assert_eq!(splits, CrossValidator::new(5).split(&y).unwrap());
    }

    #[test]
    fn test_uneven_classes_follow_round_robin_allocation() {
        // Ordered labels [1,1,1,0,0,0,0] dealt over 3 folds: fold 0 gets
        // positions 0,3,6 -> one of class 1 and two of class 0
        let y = Array1::from_vec(vec![1, 0, 1, 0, 1, 0, 0]);
        let splits = CrossValidator::new(3).split(&y).unwrap();
        assert_eq!(splits[0].test_indices, vec![0, 1, 3]);
        assert_eq!(splits[2].test_indices, vec![4, 6]);
    }

    #[test]
    fn test_every_row_tested_once() {
        let y = labels();
        let mut tested: Vec<usize> = CrossValidator::new(4)
            .split(&y)
            .unwrap()
            .into_iter()
            .flat_map(|s| s.test_indices)
            .collect();
        tested.sort();
        assert_eq!(tested, (0..y.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_small_class_rejected() {
        let y = Array1::from_vec(vec![0, 0, 0, 0, 0, 1, 1]);
        assert!(CrossValidator::new(5).split(&y).is_err());
    }
}
