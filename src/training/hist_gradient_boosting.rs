//! Histogram-based gradient boosting
//!
//! Features are bucketed into at most `max_bins` quantile bins once per fit.
//! Trees grow best-first on per-bin gradient histograms until they reach
//! `max_leaf_nodes` leaves, `max_depth`, or run out of admissible splits.

use super::models::{check_xy, Regressor};
use crate::error::{Result, SalaryError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Rows used to compute bin edges on large inputs
const BINNING_SUBSAMPLE: usize = 200_000;

/// Upper bin edges of one feature. A value `v` falls in the first bin whose
/// edge is `>= v`, or in the last bin past every edge.
fn bin_edges(values: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut distinct = sorted.clone();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }
    let n = sorted.len();
    let mut edges: Vec<f64> = (1..max_bins)
        .map(|k| {
            let pos = k * n / max_bins;
            (sorted[pos - 1] + sorted[pos]) / 2.0
        })
        .collect();
    edges.dedup();
    edges
}

fn bin_of(edges: &[f64], value: f64) -> usize {
    edges.partition_point(|e| *e < value)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum HistNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Tree stored as an arena; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistTree {
    nodes: Vec<HistNode>,
}

impl HistTree {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                HistNode::Leaf { value } => return *value,
                HistNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    fn depth_of(&self, id: usize) -> usize {
        match &self.nodes[id] {
            HistNode::Leaf { .. } => 0,
            HistNode::Split { left, right, .. } => {
                1 + self.depth_of(*left).max(self.depth_of(*right))
            }
        }
    }

    fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, HistNode::Leaf { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
struct HistSplit {
    feature: usize,
    /// Rows with bin <= `bin` go left
    bin: usize,
    gain: f64,
}

/// A leaf that may still be split
struct GrowingLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: HistSplit,
}

/// Per-fit state shared by every tree
struct TreeGrower<'a> {
    binned: &'a Array2<u16>,
    edges: &'a [Vec<f64>],
    grad: &'a Array1<f64>,
    model: &'a HistGradientBoostingRegressor,
}

impl TreeGrower<'_> {
    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        -self.model.learning_rate * g / (rows.len() as f64 + self.model.l2_regularization)
    }

    fn can_split(&self, depth: usize, n_rows: usize) -> bool {
        self.model.max_depth.map_or(true, |d| depth < d)
            && n_rows >= 2 * self.model.min_samples_leaf
    }

    /// Best split over gradient histograms; hessians are all 1
    fn find_split(&self, rows: &[usize]) -> Option<HistSplit> {
        let lambda = self.model.l2_regularization;
        let min_leaf = self.model.min_samples_leaf;
        let g_total: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let n_total = rows.len();
        let parent = g_total * g_total / (n_total as f64 + lambda);

        (0..self.edges.len())
            .into_par_iter()
            .filter_map(|feature| {
                let n_bins = self.edges[feature].len() + 1;
                let mut hist = vec![(0.0f64, 0usize); n_bins];
                for &i in rows {
                    let slot = &mut hist[self.binned[[i, feature]] as usize];
                    slot.0 += self.grad[i];
                    slot.1 += 1;
                }

                let (mut g_left, mut n_left) = (0.0f64, 0usize);
                let mut best: Option<HistSplit> = None;
                for (bin, &(g, n)) in hist.iter().enumerate().take(n_bins - 1) {
                    g_left += g;
                    n_left += n;
                    let n_right = n_total - n_left;
                    if n_left < min_leaf || n_right < min_leaf {
                        continue;
                    }
                    let g_right = g_total - g_left;
                    let gain = 0.5
                        * (g_left * g_left / (n_left as f64 + lambda)
                            + g_right * g_right / (n_right as f64 + lambda)
                            - parent);
                    if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                        best = Some(HistSplit { feature, bin, gain });
                    }
                }
                best
            })
            .reduce_with(|a, b| {
                if b.gain > a.gain || (b.gain == a.gain && b.feature < a.feature) {
                    b
                } else {
                    a
                }
            })
    }

    fn candidate(&self, node: usize, rows: Vec<usize>, depth: usize) -> Option<GrowingLeaf> {
        if !self.can_split(depth, rows.len()) {
            return None;
        }
        let split = self.find_split(&rows)?;
        Some(GrowingLeaf {
            node,
            rows,
            depth,
            split,
        })
    }

    fn grow(&self, n_rows: usize) -> HistTree {
        let all: Vec<usize> = (0..n_rows).collect();
        let mut nodes = vec![HistNode::Leaf {
            value: self.leaf_value(&all),
        }];
        let mut frontier: Vec<GrowingLeaf> = self.candidate(0, all, 0).into_iter().collect();
        let mut n_leaves = 1;

        while n_leaves < self.model.max_leaf_nodes {
            // highest gain, oldest leaf on ties
            let Some(pos) = frontier
                .iter()
                .enumerate()
                .fold(None::<(usize, f64)>, |best, (pos, leaf)| match best {
                    Some((_, gain)) if gain >= leaf.split.gain => best,
                    _ => Some((pos, leaf.split.gain)),
                })
                .map(|(pos, _)| pos)
            else {
                break;
            };
            let leaf = frontier.remove(pos);
            let HistSplit { feature, bin, .. } = leaf.split;
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .iter()
                .partition(|&&i| usize::from(self.binned[[i, feature]]) <= bin);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(HistNode::Leaf {
                value: self.leaf_value(&left_rows),
            });
            nodes.push(HistNode::Leaf {
                value: self.leaf_value(&right_rows),
            });
            nodes[leaf.node] = HistNode::Split {
                feature,
                threshold: self.edges[feature][bin],
                left,
                right,
            };
            n_leaves += 1;

            frontier.extend(self.candidate(left, left_rows, leaf.depth + 1));
            frontier.extend(self.candidate(right, right_rows, leaf.depth + 1));
        }
        HistTree { nodes }
    }
}

/// Histogram gradient boosting regressor on squared error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistGradientBoostingRegressor {
    pub max_iter: usize,
    pub learning_rate: f64,
    /// `None` grows until `max_leaf_nodes`
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
    pub max_leaf_nodes: usize,
    pub max_bins: usize,
    pub random_state: u64,
    bin_edges: Vec<Vec<f64>>,
    baseline: f64,
    trees: Vec<HistTree>,
}

impl Default for HistGradientBoostingRegressor {
    fn default() -> Self {
        Self::new(100, 0.1)
    }
}

impl HistGradientBoostingRegressor {
    pub fn new(max_iter: usize, learning_rate: f64) -> Self {
        Self {
            max_iter,
            learning_rate,
            max_depth: None,
            min_samples_leaf: 20,
            l2_regularization: 0.0,
            max_leaf_nodes: 31,
            max_bins: 255,
            random_state: 25,
            bin_edges: Vec::new(),
            baseline: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_l2_regularization(mut self, l2: f64) -> Self {
        self.l2_regularization = l2;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn n_iter(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<()> {
        let bad = |name: &str, value: String, reason: &str| {
            Err(SalaryError::InvalidParameter {
                name: name.to_string(),
                value,
                reason: reason.to_string(),
            })
        };
        if !(self.learning_rate > 0.0) {
            return bad("learning_rate", self.learning_rate.to_string(), "must be positive");
        }
        if self.min_samples_leaf == 0 {
            return bad("min_samples_leaf", "0".to_string(), "must be positive");
        }
        if !(self.l2_regularization >= 0.0) {
            return bad(
                "l2_regularization",
                self.l2_regularization.to_string(),
                "must be non-negative",
            );
        }
        if self.max_leaf_nodes < 2 {
            return bad("max_leaf_nodes", self.max_leaf_nodes.to_string(), "must be at least 2");
        }
        if !(2..=256).contains(&self.max_bins) {
            return bad("max_bins", self.max_bins.to_string(), "must be in 2..=256");
        }
        Ok(())
    }

    fn fit_bins(&mut self, x: &Array2<f64>) {
        let n = x.nrows();
        let rows: Vec<usize> = if n > BINNING_SUBSAMPLE {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            index::sample(&mut rng, n, BINNING_SUBSAMPLE).into_vec()
        } else {
            (0..n).collect()
        };
        self.bin_edges = x
            .columns()
            .into_iter()
            .map(|col| {
                let values: Vec<f64> = rows.iter().map(|&i| col[i]).collect();
                bin_edges(&values, self.max_bins)
            })
            .collect();
    }
}

impl Regressor for HistGradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        self.validate()?;
        self.fit_bins(x);

        let edges = &self.bin_edges;
        let binned =
            Array2::from_shape_fn(x.dim(), |(i, j)| bin_of(&edges[j], x[[i, j]]) as u16);
        let baseline = y.mean().unwrap_or(0.0);
        let mut raw = Array1::from_elem(x.nrows(), baseline);
        let mut trees = Vec::with_capacity(self.max_iter);

        for iteration in 0..self.max_iter {
            let grad: Array1<f64> = &raw - y;
            let grower = TreeGrower {
                binned: &binned,
                edges: &self.bin_edges,
                grad: &grad,
                model: self,
            };
            let tree = grower.grow(x.nrows());
            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += tree.predict_row(row);
            }
            if iteration % 50 == 0 {
                let mse = grad.mapv(|g| g * g).mean().unwrap_or(0.0);
                trace!(
                    iteration,
                    mse,
                    leaves = tree.n_leaves(),
                    depth = tree.depth_of(0),
                    "Histogram boosting iteration"
                );
            }
            trees.push(tree);
        }

        self.baseline = baseline;
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() && self.max_iter > 0 {
            return Err(SalaryError::ModelNotFitted);
        }
        if x.ncols() != self.bin_edges.len() {
            return Err(SalaryError::ShapeError {
                expected: format!("{} features", self.bin_edges.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| self.baseline + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect())
    }
}
