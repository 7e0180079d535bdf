//! Regressor trait and evaluation metrics

use crate::error::{Result, SalaryError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Coefficient of determination. A constant target scores 1.0 when matched
/// exactly and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Regression metrics of one split, rounded for reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// R², 2 decimals
    pub r2: f64,
    /// Mean absolute error, 1 decimal
    pub mae: f64,
    /// Root mean squared error, 1 decimal
    pub rmse: f64,
    /// MAE as a percentage of the mean prediction, 1 decimal
    pub rel_mae: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() || y_true.is_empty() {
            return Err(SalaryError::ShapeError {
                expected: format!("{} non-empty predictions", y_true.len()),
                actual: format!("{}", y_pred.len()),
            });
        }

        let n = y_true.len() as f64;
        let mae = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).abs())
            .sum::<f64>()
            / n;
        let mse = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum::<f64>()
            / n;
        let mean_pred = y_pred.sum() / n;
        let rel_mae = if mean_pred != 0.0 { mae / mean_pred * 100.0 } else { 0.0 };

        Ok(Self {
            r2: round_to(r2_score(y_true, y_pred), 2),
            mae: round_to(mae, 1),
            rmse: round_to(mse.sqrt(), 1),
            rel_mae: round_to(rel_mae, 1),
        })
    }
}

/// A fit/predict regression model over a dense feature matrix
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// R² on the given rows
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        Ok(r2_score(y, &self.predict(x)?))
    }
}

/// Shape check shared by every `fit`
pub(crate) fn check_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(SalaryError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(SalaryError::TrainingError("no training rows".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_metrics_rounding() {
        let y_true = array![1000.0, 2000.0, 3000.0, 4000.0];
        let y_pred = array![1300.0, 1700.0, 3200.0, 4000.0];
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();

        assert_eq!(m.mae, 200.0);
        assert_eq!(m.rmse, 234.5);
        assert_eq!(m.r2, 0.96);
        // 200 / 2550 * 100
        assert_eq!(m.rel_mae, 7.8);
    }

    #[test]
    fn test_r2_constant_target() {
        let y = array![5.0, 5.0];
        assert_eq!(r2_score(&y, &array![5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&y, &array![4.0, 6.0]), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.8449, 2), 0.84);
        assert_eq!(round_to(123.46, 1), 123.5);
    }
}
