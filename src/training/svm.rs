//! Epsilon-insensitive support vector regression
//!
//! Solved in the dual by coordinate descent on `beta = alpha - alpha*`,
//! with the bias folded into the kernel as `K(x, z) + 1`.

use super::models::{check_xy, Regressor};
use crate::error::{Result, SalaryError};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Above this many rows kernel columns are recomputed instead of cached
const MAX_KERNEL_MATRIX_SAMPLES: usize = 4_000;

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelType {
    /// K(x, z) = x · z
    Linear,
    /// K(x, z) = exp(-γ ||x - z||²), γ = 1 / (n_features * var(X))
    Rbf,
}

/// SVR configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SVRConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub kernel: KernelType,
    /// Half-width of the loss-free tube
    pub epsilon: f64,
    /// Stop once no coefficient moves more than this in a sweep
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for SVRConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::Rbf,
            epsilon: 0.1,
            tol: 1e-3,
            max_iter: 1000,
        }
    }
}

fn kernel(kind: KernelType, gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    match kind {
        KernelType::Linear => a.dot(&b),
        KernelType::Rbf => {
            let dist: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum();
            (-gamma * dist).exp()
        }
    }
}

/// Support vector regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVRRegressor {
    config: SVRConfig,
    gamma: f64,
    support_vectors: Option<Array2<f64>>,
    dual_coef: Array1<f64>,
}

impl Default for SVRRegressor {
    fn default() -> Self {
        Self::new(SVRConfig::default())
    }
}

impl SVRRegressor {
    pub fn new(config: SVRConfig) -> Self {
        Self {
            config,
            gamma: 1.0,
            support_vectors: None,
            dual_coef: Array1::zeros(0),
        }
    }

    pub fn config(&self) -> &SVRConfig {
        &self.config
    }

    pub fn n_support(&self) -> usize {
        self.dual_coef.len()
    }

    fn augmented_kernel(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        kernel(self.config.kernel, self.gamma, a, b) + 1.0
    }

    fn kernel_column(&self, x: &Array2<f64>, i: usize) -> Array1<f64> {
        let xi = x.row(i);
        x.rows()
            .into_iter()
            .map(|xj| self.augmented_kernel(xi, xj))
            .collect()
    }
}

/// 1 / (n_features * var(X)) over every entry of X, 1.0 for constant X
fn scale_gamma(x: &Array2<f64>) -> f64 {
    let var = x.var(0.0);
    if var > 0.0 && x.ncols() > 0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

impl Regressor for SVRRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        let SVRConfig {
            c,
            epsilon,
            tol,
            max_iter,
            ..
        } = self.config;
        if !(c > 0.0) || !(epsilon >= 0.0) {
            return Err(SalaryError::InvalidParameter {
                name: "C/epsilon".to_string(),
                value: format!("{}/{}", c, epsilon),
                reason: "C must be positive and epsilon non-negative".to_string(),
            });
        }

        let n = x.nrows();
        self.gamma = scale_gamma(x);
        let cached: Option<Vec<Array1<f64>>> = (n <= MAX_KERNEL_MATRIX_SAMPLES)
            .then(|| (0..n).into_par_iter().map(|i| self.kernel_column(x, i)).collect());
        let diag: Vec<f64> = (0..n)
            .map(|i| self.augmented_kernel(x.row(i), x.row(i)))
            .collect();

        // f = Q beta, kept up to date after every coordinate move
        let mut beta = Array1::<f64>::zeros(n);
        let mut f = Array1::<f64>::zeros(n);
        let mut converged = false;
        let mut sweeps = 0;

        while sweeps < max_iter {
            sweeps += 1;
            let mut max_change: f64 = 0.0;
            for i in 0..n {
                let q_ii = diag[i];
                if q_ii <= 0.0 {
                    continue;
                }
                let z = beta[i] - (f[i] - y[i]) / q_ii;
                let shrink = epsilon / q_ii;
                let next = (z.signum() * (z.abs() - shrink).max(0.0)).clamp(-c, c);
                let delta = next - beta[i];
                if delta == 0.0 {
                    continue;
                }
                match &cached {
                    Some(columns) => f.scaled_add(delta, &columns[i]),
                    None => f.scaled_add(delta, &self.kernel_column(x, i)),
                }
                beta[i] = next;
                max_change = max_change.max(delta.abs());
            }
            if max_change < tol {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(max_iter, "SVR did not converge");
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i] != 0.0).collect();
        debug!(sweeps, n_support = support.len(), "SVR fitted");
        self.support_vectors = Some(x.select(ndarray::Axis(0), &support));
        self.dual_coef = support.iter().map(|&i| beta[i]).collect();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let sv = self.support_vectors.as_ref().ok_or(SalaryError::ModelNotFitted)?;
        if x.ncols() != sv.ncols() {
            return Err(SalaryError::ShapeError {
                expected: format!("{} features", sv.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let rows: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                sv.rows()
                    .into_iter()
                    .zip(self.dual_coef.iter())
                    .map(|(s, b)| b * self.augmented_kernel(x.row(i), s))
                    .sum()
            })
            .collect();
        Ok(Array1::from_vec(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 1), |(i, _)| i as f64 / 10.0);
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        (x, y)
    }

    #[test]
    fn test_linear_kernel_fits_line() {
        let (x, y) = line();
        let mut model = SVRRegressor::new(SVRConfig {
            c: 10.0,
            kernel: KernelType::Linear,
            epsilon: 0.01,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        assert!(model.score(&x, &y).unwrap() > 0.97);
    }

    #[test]
    fn test_rbf_kernel_fits_curve() {
        let x = Array2::from_shape_fn((60, 1), |(i, _)| i as f64 / 10.0);
        let y = x.column(0).mapv(f64::sin);
        let mut model = SVRRegressor::new(SVRConfig {
            c: 10.0,
            epsilon: 0.01,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        assert!(model.score(&x, &y).unwrap() > 0.85);
    }

    #[test]
    fn test_wide_tube_keeps_no_support_vectors() {
        let (x, y) = line();
        let mut model = SVRRegressor::new(SVRConfig {
            kernel: KernelType::Linear,
            epsilon: 100.0,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_support(), 0);
        assert!(model.predict(&x).unwrap().iter().all(|p| *p == 0.0));
    }

    #[test]
    fn test_coefficients_bounded_by_c() {
        let (x, y) = line();
        let y = y.mapv(|v| v * 1000.0);
        let mut model = SVRRegressor::new(SVRConfig {
            c: 0.1,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        assert!(model.dual_coef.iter().all(|b| b.abs() <= 0.1 + 1e-12));
    }

    #[test]
    fn test_predict_before_fit() {
        assert!(matches!(
            SVRRegressor::default().predict(&Array2::zeros((1, 1))),
            Err(SalaryError::ModelNotFitted)
        ));
    }
}
