//! Linear regressors: ordinary least squares, ridge, lasso, elastic net and
//! Huber

use super::models::{check_xy, Regressor};
use crate::error::{Result, SalaryError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve a symmetric positive-definite system with Cholesky. A tiny ridge is
/// added once when the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    if let Some(x) = cholesky_solve_inner(a, b) {
        return Some(x);
    }
    let mut a_reg = a.clone();
    let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>().max(1.0) / n.max(1) as f64;
    for k in 0..n {
        a_reg[[k, k]] += ridge;
    }
    cholesky_solve_inner(&a_reg, b)
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Solve (XᵀWX + alpha·I) w = XᵀWy. `weights` of `None` means all ones.
fn solve_normal_equations(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: Option<&Array1<f64>>,
    alpha: f64,
) -> Result<Array1<f64>> {
    let (mut xtx, xty) = match weights {
        Some(w) => {
            let xw = x * &w.view().insert_axis(Axis(1));
            (xw.t().dot(x), xw.t().dot(y))
        }
        None => (x.t().dot(x), x.t().dot(y)),
    };
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += alpha;
    }
    cholesky_solve(&xtx, &xty).ok_or_else(|| {
        SalaryError::ComputationError("normal equations are singular".to_string())
    })
}

/// Fitted weights and bias of a linear model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearFit {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(SalaryError::ShapeError {
                expected: format!("{} features", self.coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Weighted column means of x and the weighted mean of y
fn weighted_means(x: &Array2<f64>, y: &Array1<f64>, w: Option<&Array1<f64>>) -> (Array1<f64>, f64) {
    match w {
        Some(w) => {
            let total = w.sum().max(f64::EPSILON);
            let xm = x.t().dot(w) / total;
            let ym = y.dot(w) / total;
            (xm, ym)
        }
        None => {
            let n = x.nrows().max(1) as f64;
            (x.sum_axis(Axis(0)) / n, y.sum() / n)
        }
    }
}

/// Least squares with an optional L2 penalty, centering when fitting an
/// intercept so the bias is never penalized
fn fit_least_squares(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: Option<&Array1<f64>>,
    alpha: f64,
    fit_intercept: bool,
) -> Result<LinearFit> {
    if fit_intercept {
        let (xm, ym) = weighted_means(x, y, weights);
        let xc = x - &xm.view().insert_axis(Axis(0));
        let yc = y - ym;
        let coefficients = solve_normal_equations(&xc, &yc, weights, alpha)?;
        let intercept = ym - coefficients.dot(&xm);
        Ok(LinearFit {
            coefficients,
            intercept,
        })
    } else {
        Ok(LinearFit {
            coefficients: solve_normal_equations(x, y, weights, alpha)?,
            intercept: 0.0,
        })
    }
}

fn fitted(fit: &Option<LinearFit>) -> Result<&LinearFit> {
    fit.as_ref().ok_or(SalaryError::ModelNotFitted)
}

/// Ordinary least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub fit_intercept: bool,
    fit: Option<LinearFit>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            fit: None,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.intercept)
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        self.fit = Some(fit_least_squares(x, y, None, 0.0, self.fit_intercept)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        fitted(&self.fit)?.predict(x)
    }
}

/// L2-penalized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    pub fit_intercept: bool,
    fit: Option<LinearFit>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fit_intercept: true,
            fit: None,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if self.alpha < 0.0 {
            return Err(SalaryError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        self.fit = Some(fit_least_squares(x, y, None, self.alpha, self.fit_intercept)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        fitted(&self.fit)?.predict(x)
    }
}

fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

/// Coordinate descent on (1/2n)‖y − Xw‖² + α·ρ‖w‖₁ + (α(1−ρ)/2)‖w‖²
fn coordinate_descent(
    x: &Array2<f64>,
    y: &Array1<f64>,
    alpha: f64,
    l1_ratio: f64,
    max_iter: usize,
    tol: f64,
) -> LinearFit {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    let xm = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
    let ym = y.mean().unwrap_or(0.0);
    let xc = x - &xm.view().insert_axis(Axis(0));
    let yc = y - ym;

    let col_norms: Vec<f64> = (0..n_features)
        .map(|j| xc.column(j).mapv(|v| v * v).sum())
        .collect();

    let n = n_samples as f64;
    let l1_penalty = alpha * l1_ratio * n;
    let l2_penalty = alpha * (1.0 - l1_ratio) * n;

    let mut w = Array1::<f64>::zeros(n_features);
    let mut r = yc.clone();

    for _ in 0..max_iter {
        let mut max_step = 0.0f64;
        for j in 0..n_features {
            let denom = col_norms[j] + l2_penalty;
            if denom < 1e-15 {
                continue;
            }
            let old = w[j];
            let rho = xc.column(j).dot(&r) + col_norms[j] * old;
            w[j] = soft_threshold(rho, l1_penalty) / denom;
            let step = old - w[j];
            if step != 0.0 {
                r.scaled_add(step, &xc.column(j));
                max_step = max_step.max(step.abs());
            }
        }
        if max_step < tol {
            break;
        }
    }

    let intercept = ym - w.dot(&xm);
    LinearFit {
        coefficients: w,
        intercept,
    }
}

/// L1-penalized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    fit: Option<LinearFit>,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            fit: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        self.fit = Some(coordinate_descent(x, y, self.alpha, 1.0, self.max_iter, self.tol));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        fitted(&self.fit)?.predict(x)
    }
}

/// L1 + L2 penalized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetRegression {
    pub alpha: f64,
    /// 0.0 is pure ridge, 1.0 is pure lasso
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    fit: Option<LinearFit>,
}

impl Default for ElasticNetRegression {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}

impl ElasticNetRegression {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self {
            alpha,
            l1_ratio: l1_ratio.clamp(0.0, 1.0),
            max_iter: 1000,
            tol: 1e-4,
            fit: None,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }
}

impl Regressor for ElasticNetRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        self.fit = Some(coordinate_descent(
            x,
            y,
            self.alpha,
            self.l1_ratio,
            self.max_iter,
            self.tol,
        ));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        fitted(&self.fit)?.predict(x)
    }
}

/// Median of absolute values
fn median_abs(values: &Array1<f64>) -> f64 {
    let mut v: Vec<f64> = values.iter().map(|r| r.abs()).collect();
    v.sort_by(|a, b| a.total_cmp(b));
    let n = v.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        v[n / 2]
    } else {
        (v[n / 2 - 1] + v[n / 2]) / 2.0
    }
}

/// Huber-loss regression fitted by iteratively reweighted least squares.
///
/// Residuals beyond `epsilon` robust standard deviations (MAD / 0.6745) are
/// down-weighted linearly. `alpha` is an L2 penalty on the coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuberRegressor {
    pub epsilon: f64,
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    fit: Option<LinearFit>,
}

impl Default for HuberRegressor {
    fn default() -> Self {
        Self::new(1.35, 0.0001)
    }
}

impl HuberRegressor {
    pub fn new(epsilon: f64, alpha: f64) -> Self {
        Self {
            epsilon,
            alpha,
            max_iter: 100,
            tol: 1e-6,
            fit: None,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }
}

impl Regressor for HuberRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if self.epsilon < 1.0 {
            return Err(SalaryError::InvalidParameter {
                name: "epsilon".to_string(),
                value: self.epsilon.to_string(),
                reason: "must be at least 1.0".to_string(),
            });
        }

        let mut fit = fit_least_squares(x, y, None, self.alpha, true)?;
        for _ in 0..self.max_iter {
            let residuals = y - &fit.predict(x)?;
            let scale = (median_abs(&residuals) / 0.6745).max(1e-12);
            let weights = residuals.mapv(|r| {
                let z = r.abs() / scale;
                if z <= self.epsilon {
                    1.0
                } else {
                    self.epsilon / z
                }
            });

            let next = fit_least_squares(x, y, Some(&weights), self.alpha, true)?;
            let change = (&next.coefficients - &fit.coefficients)
                .mapv(f64::abs)
                .sum()
                + (next.intercept - fit.intercept).abs();
            fit = next;
            if change < self.tol {
                break;
            }
        }

        self.fit = Some(fit);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        fitted(&self.fit)?.predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn line() -> (Array2<f64>, Array1<f64>) {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![3.0, 5.0, 7.0, 9.0, 11.0, 13.0];
        (x, y)
    }

    #[test]
    fn test_ols_recovers_line() {
        let (x, y) = line();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        assert!((model.coefficients().unwrap()[0] - 2.0).abs() < 1e-8);
        assert!((model.intercept().unwrap() - 1.0).abs() < 1e-8);
        assert!(model.score(&x, &y).unwrap() > 0.999);
    }

    #[test]
    fn test_no_intercept_passes_through_origin() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 6.0];
        let mut model = LinearRegression::new().with_fit_intercept(false);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.intercept(), Some(0.0));
        assert!((model.coefficients().unwrap()[0] - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_ridge_shrinks() {
        let (x, y) = line();
        let mut weak = RidgeRegression::new(0.1);
        let mut strong = RidgeRegression::new(100.0);
        weak.fit(&x, &y).unwrap();
        strong.fit(&x, &y).unwrap();
        assert!(strong.coefficients().unwrap()[0] < weak.coefficients().unwrap()[0]);
    }

    #[test]
    fn test_lasso_zeroes_noise_feature() {
        let x = array![[1.0, 0.1], [2.0, -0.1], [3.0, 0.1], [4.0, -0.1], [5.0, 0.1], [6.0, -0.1]];
        let y = array![3.0, 5.0, 7.0, 9.0, 11.0, 13.0];
        let mut model = LassoRegression::new(0.1);
        model.fit(&x, &y).unwrap();
        let coef = model.coefficients().unwrap();
        assert!(coef[0] > 1.5);
        assert_eq!(coef[1], 0.0);
    }

    #[test]
    fn test_elastic_net_fits() {
        let (x, y) = line();
        let mut model = ElasticNetRegression::new(0.001, 0.5);
        model.fit(&x, &y).unwrap();
        assert!(model.score(&x, &y).unwrap() > 0.99);
    }

    #[test]
    fn test_huber_resists_outlier() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let mut y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        y[7] = 100.0;

        let mut ols = LinearRegression::new();
        ols.fit(&x, &y).unwrap();
        let mut huber = HuberRegressor::new(1.35, 0.0001);
        huber.fit(&x, &y).unwrap();

        let h = huber.coefficients().unwrap()[0];
        let o = ols.coefficients().unwrap()[0];
        assert!((h - 2.0).abs() < (o - 2.0).abs());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(SalaryError::ModelNotFitted)
        ));
    }
}
