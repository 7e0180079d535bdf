//! Gradient boosting on squared error

use super::decision_tree::DecisionTreeRegressor;
use super::models::{check_xy, Regressor};
use crate::error::{Result, SalaryError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Stage-wise additive trees fitted to the residuals of the running
/// prediction, starting from the target mean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub random_state: u64,
    initial_prediction: f64,
    trees: Vec<DecisionTreeRegressor>,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(100, 0.1, 3)
    }
}

impl GradientBoostingRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            min_samples_split: 2,
            random_state: 25,
            initial_prediction: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if !(self.learning_rate > 0.0) {
            return Err(SalaryError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        self.trees = Vec::with_capacity(self.n_estimators);

        for stage in 0..self.n_estimators {
            let residuals = y - &predictions;
            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(Some(self.max_depth))
                .with_min_samples_split(self.min_samples_split)
                .with_seed(self.random_state.wrapping_add(stage as u64));
            tree.fit(x, &residuals)?;

            let update = tree.predict(x)?;
            predictions.scaled_add(self.learning_rate, &update);
            self.trees.push(tree);

            if stage % 50 == 0 {
                let mse = residuals.mapv(|r| r * r).mean().unwrap_or(0.0);
                trace!(stage, mse, "Boosting stage");
            }
        }
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() && self.n_estimators > 0 {
            return Err(SalaryError::ModelNotFitted);
        }
        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }
}
