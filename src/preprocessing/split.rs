//! Stratified train/test split

use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Materialized train/test matrices
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
}

/// Partition rows so each class keeps its proportion in both halves.
///
/// Each class is shuffled with a seeded RNG (classes visited in ascending
/// order) and contributes `round(n_c * test_size)` rows to the test side,
/// clamped to `[1, n_c - 1]`.
pub fn stratified_split_indices(y: &Array1<i64>, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(RiskError::invalid_param("test_size", test_size, "must be in (0, 1)"));
    }

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    if let Some((class, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
        return Err(RiskError::ValidationError(format!(
            "Class {} has {} member(s); stratified split needs at least 2",
            class,
            members.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for members in by_class.values_mut() {
        members.shuffle(&mut rng);
        let n = members.len();
        let n_test = ((n as f64 * test_size).round() as usize).clamp(1, n - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

/// Stratified split of a feature matrix and its labels
pub fn stratified_split(
    x: &Array2<f64>,
    y: &Array1<i64>,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if x.nrows() != y.len() {
        return Err(RiskError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    let idx = stratified_split_indices(y, test_size, seed)?;
    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &idx.train),
        x_test: x.select(Axis(0), &idx.test),
        y_train: y.select(Axis(0), &idx.train),
        y_test: y.select(Axis(0), &idx.test),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Array1<i64> {
        let mut v = vec![0i64; 50];
        v.extend(vec![1i64; 30]);
        v.extend(vec![2i64; 20]);
        Array1::from_vec(v)
    }

    #[test]
    fn test_split_preserves_class_proportions() {
        let y = labels();
        let idx = stratified_split_indices(&y, 0.2, 42).unwrap();
        assert_eq!(idx.train.len() + idx.test.len(), 100);

        let test_counts = |class: i64| idx.test.iter().filter(|&&i| y[i] == class).count();
        assert_eq!(test_counts(0), 10);
        assert_eq!(test_counts(1), 6);
        assert_eq!(test_counts(2), 4);
    }

    #[test]
    fn test_split_is_disjoint_and_deterministic() {
        let y = labels();
        let a = stratified_split_indices(&y, 0.2, 42).unwrap();
        let b = stratified_split_indices(&y, 0.2, 42).unwrap();
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train.iter().chain(a.test.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_singleton_class_rejected() {
        let y = Array1::from_vec(vec![0, 0, 0, 1]);
        assert!(matches!(
            stratified_split_indices(&y, 0.2, 42),
            Err(RiskError::ValidationError(_))
        ));
    }

    #[test]
    fn test_split_matrices() {
        let x = Array2::from_shape_fn((100, 3), |(i, j)| (i * 3 + j) as f64);
        let y = labels();
        let split = stratified_split(&x, &y, 0.2, 7).unwrap();
        assert_eq!(split.x_train.nrows(), split.y_train.len());
        assert_eq!(split.x_test.nrows(), 20);
        // rows travel with their labels
        for (row, &label) in split.x_test.rows().into_iter().zip(split.y_test.iter()) {
            let original = (row[0] as usize) / 3;
            assert_eq!(y[original], label);
        }
    }
}
