//! XGBoost-style gradient boosting with second-order approximation
//!
//! Differences from [`GradientBoostingRegressor`](super::GradientBoostingRegressor):
//! - Leaf weights use both gradient and hessian: w* = -G / (H + lambda)
//! - Splits are scored by gain: 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)] - γ
//! - Rows and columns are subsampled per tree
//! - Children must carry at least `min_child_weight` hessian

use super::models::{check_xy, Regressor};
use crate::error::{Result, SalaryError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::trace;

/// XGBoost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: u64,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Optimal leaf weight with L1 and L2 regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g_sum > alpha {
        g_sum - alpha
    } else if g_sum < -alpha {
        g_sum + alpha
    } else {
        return 0.0;
    };
    -g_adj / (h_sum + lambda)
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Exact greedy split search over one feature
fn best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<SplitCandidate> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
    let lambda = config.reg_lambda;
    let parent = g_total * g_total / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for pos in 0..sorted.len().saturating_sub(1) {
        let idx = sorted[pos];
        let next = sorted[pos + 1];
        g_left += grad[idx];
        h_left += hess[idx];

        if (x[[idx, feature]] - x[[next, feature]]).abs() < 1e-12 {
            continue;
        }
        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                - parent);
        if best.as_ref().map_or(true, |b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (x[[idx, feature]] + x[[next, feature]]) / 2.0,
                gain,
            });
        }
    }
    best
}

fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    features: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return XGBNode::Leaf { weight };
    }

    // ties keep the lowest feature index
    let best = features
        .par_iter()
        .filter_map(|&f| best_split_for_feature(x, grad, hess, indices, f, config))
        .reduce_with(|a, b| match b.gain.partial_cmp(&a.gain) {
            Some(Ordering::Greater) => b,
            Some(Ordering::Equal) if b.feature < a.feature => b,
            _ => a,
        });

    match best {
        Some(split) if split.gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);
            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf { weight };
            }
            let left = build_xgb_tree(x, grad, hess, &left_idx, features, depth + 1, config);
            let right = build_xgb_tree(x, grad, hess, &right_idx, features, depth + 1, config);
            XGBNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight },
    }
}

/// Sorted random subset of `0..n` holding `ceil(n * ratio)` indices
fn subsample(rng: &mut ChaCha8Rng, n: usize, ratio: f64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if ratio >= 1.0 {
        return indices;
    }
    let take = ((n as f64 * ratio).ceil() as usize).clamp(1, n);
    indices.shuffle(rng);
    indices.truncate(take);
    indices.sort_unstable();
    indices
}

/// XGBoost regressor on squared error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostRegressor {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
}

impl Default for XGBoostRegressor {
    fn default() -> Self {
        Self::new(XGBoostConfig::default())
    }
}

impl XGBoostRegressor {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate_config(&self) -> Result<()> {
        let c = &self.config;
        let ratio_ok = |r: f64| r > 0.0 && r <= 1.0;
        let (name, value) = if !(c.learning_rate > 0.0) {
            ("learning_rate", c.learning_rate)
        } else if !ratio_ok(c.subsample) {
            ("subsample", c.subsample)
        } else if !ratio_ok(c.colsample_bytree) {
            ("colsample_bytree", c.colsample_bytree)
        } else if c.max_depth == 0 {
            ("max_depth", 0.0)
        } else {
            return Ok(());
        };
        Err(SalaryError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: "out of range".to_string(),
        })
    }
}

impl Regressor for XGBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        self.validate_config()?;

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.base_score = y.mean().unwrap_or(0.0);
        let mut preds = Array1::from_elem(n_samples, self.base_score);
        let hess = Array1::from_elem(n_samples, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);

        self.trees = Vec::with_capacity(self.config.n_estimators);
        for round in 0..self.config.n_estimators {
            // squared error: grad = pred - y, hess = 1
            let grad: Array1<f64> = &preds - y;
            let rows = subsample(&mut rng, n_samples, self.config.subsample);
            let cols = subsample(&mut rng, self.n_features, self.config.colsample_bytree);

            let tree = build_xgb_tree(x, &grad, &hess, &rows, &cols, 0, &self.config);
            for (i, row) in x.rows().into_iter().enumerate() {
                preds[i] += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);

            if round % 50 == 0 {
                let mse = grad.mapv(|g| g * g).mean().unwrap_or(0.0);
                trace!(round, mse, "XGBoost round");
            }
        }
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() && self.config.n_estimators > 0 {
            return Err(SalaryError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(SalaryError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict(row))
                        .sum::<f64>()
            })
            .collect())
    }
}
