//! Shuffled train/test split

use crate::data::numeric_column;
use crate::error::{Result, SalaryError};
use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Features and target of both splits
#[derive(Debug, Clone)]
pub struct DataBundle {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Rows of a frame at the given positions, in that order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}

/// Target column as a dense vector. Nulls are rejected.
pub fn target_vector(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    numeric_column(df, target)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| SalaryError::DataError(format!("missing target at row {}", row)))
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}

/// Elements of a vector at the given positions
pub fn take_values(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    indices.iter().map(|&i| y[i]).collect()
}

/// Shuffle rows with `seed`, put `floor(train_size * n)` rows in the training
/// split and the rest in the test split. Features are every column but
/// `target`.
pub fn train_test_split(
    df: &DataFrame,
    target: &str,
    train_size: f64,
    seed: u64,
) -> Result<DataBundle> {
    if !(train_size > 0.0 && train_size < 1.0) {
        return Err(SalaryError::InvalidParameter {
            name: "train_size".to_string(),
            value: train_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n = df.height();
    let n_train = (train_size * n as f64).floor() as usize;
    let n_test = n - n_train;
    if n_train == 0 || n_test == 0 {
        return Err(SalaryError::DataError(format!(
            "{} rows cannot be split with train_size {}",
            n, train_size
        )));
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let (test_idx, train_idx) = permutation.split_at(n_test);

    let y = target_vector(df, target)?;
    let features = df.drop(target)?;

    info!(train = n_train, test = n_test, seed, "Split dataset");
    Ok(DataBundle {
        x_train: take_rows(&features, train_idx)?,
        x_test: take_rows(&features, test_idx)?,
        y_train: take_values(&y, train_idx),
        y_test: take_values(&y, test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> DataFrame {
        let ids: Vec<i64> = (0..n as i64).collect();
        let salary: Vec<f64> = (0..n).map(|i| 1000.0 + i as f64).collect();
        df!("id" => ids, "salary_usd" => salary).unwrap()
    }

    #[test]
    fn test_split_sizes_and_target_alignment() {
        let bundle = train_test_split(&frame(10), "salary_usd", 0.8, 25).unwrap();
        assert_eq!(bundle.x_train.height(), 8);
        assert_eq!(bundle.x_test.height(), 2);
        assert_eq!(bundle.x_train.width(), 1);

        let ids = bundle.x_train.column("id").unwrap().i64().unwrap().clone();
        for (id, y) in ids.into_iter().zip(bundle.y_train.iter()) {
            assert_eq!(id.unwrap() as f64 + 1000.0, *y);
        }
    }

    #[test]
    fn test_split_is_seeded() {
        let a = train_test_split(&frame(20), "salary_usd", 0.8, 25).unwrap();
        let b = train_test_split(&frame(20), "salary_usd", 0.8, 25).unwrap();
        assert_eq!(a.y_test, b.y_test);
    }

    #[test]
    fn test_missing_target() {
        assert!(matches!(
            train_test_split(&frame(10), "salary", 0.8, 25),
            Err(SalaryError::FeatureNotFound(_))
        ));
    }
}
