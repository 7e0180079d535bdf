//! K-nearest-neighbours regression over Euclidean distance

use super::models::{check_xy, Regressor};
use crate::error::{Result, SalaryError};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Weighting of the neighbours in the average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    #[default]
    Uniform,
    /// Inverse distance; exact matches take all the weight
    Distance,
}

/// KNN regressor. Fitting stores the training rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    pub n_neighbors: usize,
    pub weights: WeightScheme,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNNRegressor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KNNRegressor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            weights: WeightScheme::Uniform,
            x_train: None,
            y_train: None,
        }
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }
}

impl Regressor for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if self.n_neighbors == 0 {
            return Err(SalaryError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if x.nrows() < self.n_neighbors {
            return Err(SalaryError::TrainingError(format!(
                "n_neighbors = {} exceeds {} training rows",
                self.n_neighbors,
                x.nrows()
            )));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(SalaryError::ModelNotFitted),
        };
        if x.ncols() != x_train.ncols() {
            return Err(SalaryError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbours = k_nearest(x.row(i), x_train, y_train, self.n_neighbors);
                weighted_mean(&neighbours, self.weights)
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}

/// Heap entry ordered by distance, then training row
#[derive(PartialEq)]
struct Neighbour {
    dist: f64,
    index: usize,
    target: f64,
}

impl Eq for Neighbour {}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.index.cmp(&other.index))
    }
}

/// k smallest distances via a bounded max-heap
fn k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (index, row) in x_train.rows().into_iter().enumerate() {
        let dist = point
            .iter()
            .zip(row.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        heap.push(Neighbour {
            dist,
            index,
            target: y_train[index],
        });
        if heap.len() > k {
            heap.pop();
        }
    }
    heap.into_iter().map(|n| (n.dist, n.target)).collect()
}

fn weighted_mean(neighbours: &[(f64, f64)], weights: WeightScheme) -> f64 {
    let uniform = |items: &[(f64, f64)]| {
        items.iter().map(|(_, y)| y).sum::<f64>() / items.len().max(1) as f64
    };
    match weights {
        WeightScheme::Uniform => uniform(neighbours),
        WeightScheme::Distance => {
            let exact: Vec<(f64, f64)> =
                neighbours.iter().copied().filter(|(d, _)| *d == 0.0).collect();
            if !exact.is_empty() {
                return uniform(&exact);
            }
            let (sum, total) = neighbours
                .iter()
                .fold((0.0, 0.0), |(s, t), &(d, y)| (s + y / d, t + 1.0 / d));
            sum / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_uniform_average() {
        let x = array![[0.0], [1.0], [2.0], [10.0]];
        let y = array![1.0, 2.0, 3.0, 100.0];
        let mut knn = KNNRegressor::new(3);
        knn.fit(&x, &y).unwrap();
        let pred = knn.predict(&array![[1.0]]).unwrap();
        assert!((pred[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weights_exact_match() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut knn = KNNRegressor::new(3).with_weights(WeightScheme::Distance);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[2.0]]).unwrap()[0], 3.0);
        // weights 2, 2, 2/3
        assert!((knn.predict(&array![[0.5]]).unwrap()[0] - 12.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_rows() {
        let mut knn = KNNRegressor::new(7);
        assert!(knn.fit(&array![[0.0], [1.0]], &array![1.0, 2.0]).is_err());
    }
}
