//! Fixed catalog of model families and their hyper-parameter grids
//!
//! Iteration order of [`ModelFamily::ALL`] is the selection tie-break order.

use super::decision_tree::DecisionTreeRegressor;
use super::gradient_boosting::GradientBoostingRegressor;
use super::hist_gradient_boosting::HistGradientBoostingRegressor;
use super::knn::{KNNRegressor, WeightScheme};
use super::linear_models::{
    ElasticNetRegression, HuberRegressor, LassoRegression, LinearRegression, RidgeRegression,
};
use super::pipeline::TrainedRegressor;
use super::random_forest::RandomForestRegressor;
use super::svm::{KernelType, SVRConfig, SVRRegressor};
use super::xgboost::{XGBoostConfig, XGBoostRegressor};
use crate::error::{Result, SalaryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Seed of every stochastic model
pub const MODEL_SEED: u64 = 25;

/// A single hyper-parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Only ever `None`, meaning unlimited. Bounded depths are `Int` so
    /// that untagged deserialization restores the same variant.
    OptionalInt(Option<i64>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => write!(f, "{}", s),
            ParamValue::OptionalInt(Some(i)) => write!(f, "{}", i),
            ParamValue::OptionalInt(None) => write!(f, "None"),
        }
    }
}

/// Parameter name -> value of one grid candidate
pub type HyperParams = BTreeMap<String, ParamValue>;

fn invalid(name: &str, value: Option<&ParamValue>, reason: &str) -> SalaryError {
    SalaryError::InvalidParameter {
        name: name.to_string(),
        value: value.map_or_else(|| "<missing>".to_string(), |v| v.to_string()),
        reason: reason.to_string(),
    }
}

fn get_bool(params: &HyperParams, name: &str) -> Result<bool> {
    match params.get(name) {
        Some(ParamValue::Bool(b)) => Ok(*b),
        other => Err(invalid(name, other, "expected a boolean")),
    }
}

fn get_f64(params: &HyperParams, name: &str) -> Result<f64> {
    match params.get(name) {
        Some(ParamValue::Float(x)) => Ok(*x),
        Some(ParamValue::Int(i)) => Ok(*i as f64),
        other => Err(invalid(name, other, "expected a number")),
    }
}

fn get_usize(params: &HyperParams, name: &str) -> Result<usize> {
    match params.get(name) {
        Some(ParamValue::Int(i)) if *i > 0 => Ok(*i as usize),
        other => Err(invalid(name, other, "expected a positive integer")),
    }
}

fn get_optional_usize(params: &HyperParams, name: &str) -> Result<Option<usize>> {
    match params.get(name) {
        Some(ParamValue::OptionalInt(None)) => Ok(None),
        Some(ParamValue::OptionalInt(Some(i))) | Some(ParamValue::Int(i)) if *i > 0 => {
            Ok(Some(*i as usize))
        }
        other => Err(invalid(name, other, "expected a positive integer or None")),
    }
}

/// Hyper-parameter grid in declaration order
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    params: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.params.push((name.to_string(), values));
        self
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.params.iter().map(|(_, v)| v.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cartesian product; the last parameter varies fastest
    pub fn expand(&self) -> Vec<HyperParams> {
        let mut out = vec![HyperParams::new()];
        for (name, values) in &self.params {
            out = out
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |v| {
                        let mut next = base.clone();
                        next.insert(name.clone(), v.clone());
                        next
                    })
                })
                .collect();
        }
        out
    }
}

fn floats(values: &[f64]) -> Vec<ParamValue> {
    values.iter().map(|v| ParamValue::Float(*v)).collect()
}

fn ints(values: &[i64]) -> Vec<ParamValue> {
    values.iter().map(|v| ParamValue::Int(*v)).collect()
}

fn depths(values: &[Option<i64>]) -> Vec<ParamValue> {
    values
        .iter()
        .map(|v| match v {
            Some(depth) => ParamValue::Int(*depth),
            None => ParamValue::OptionalInt(None),
        })
        .collect()
}

fn texts(values: &[&str]) -> Vec<ParamValue> {
    values.iter().map(|v| ParamValue::Text(v.to_string())).collect()
}

/// Regression model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    LinearRegression,
    Ridge,
    Lasso,
    ElasticNet,
    SVR,
    KNN,
    DecisionTree,
    RandomForest,
    GradientBoosting,
    XGBoost,
    Huber,
    HistGBM,
}

impl ModelFamily {
    /// Catalog order
    pub const ALL: [ModelFamily; 12] = [
        ModelFamily::LinearRegression,
        ModelFamily::Ridge,
        ModelFamily::Lasso,
        ModelFamily::ElasticNet,
        ModelFamily::SVR,
        ModelFamily::KNN,
        ModelFamily::DecisionTree,
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
        ModelFamily::XGBoost,
        ModelFamily::Huber,
        ModelFamily::HistGBM,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::LinearRegression => "LinearRegression",
            ModelFamily::Ridge => "Ridge",
            ModelFamily::Lasso => "Lasso",
            ModelFamily::ElasticNet => "ElasticNet",
            ModelFamily::SVR => "SVR",
            ModelFamily::KNN => "KNN",
            ModelFamily::DecisionTree => "DecisionTree",
            ModelFamily::RandomForest => "RandomForest",
            ModelFamily::GradientBoosting => "GradientBoosting",
            ModelFamily::XGBoost => "XGBoost",
            ModelFamily::Huber => "Huber",
            ModelFamily::HistGBM => "HistGBM",
        }
    }

    /// Families in catalog order, optionally restricted to the given names
    pub fn catalog(filter: Option<&[String]>) -> Result<Vec<ModelFamily>> {
        match filter {
            None => Ok(Self::ALL.to_vec()),
            Some(names) => {
                let wanted = names
                    .iter()
                    .map(|n| n.parse::<ModelFamily>())
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::ALL
                    .into_iter()
                    .filter(|f| wanted.contains(f))
                    .collect())
            }
        }
    }

    pub fn param_grid(&self) -> ParamGrid {
        let bools = vec![ParamValue::Bool(true), ParamValue::Bool(false)];
        match self {
            ModelFamily::LinearRegression => ParamGrid::new().with("fit_intercept", bools),
            ModelFamily::Ridge => ParamGrid::new()
                .with("alpha", floats(&[0.1, 1.0, 10.0]))
                .with("fit_intercept", bools),
            ModelFamily::Lasso => ParamGrid::new().with("alpha", floats(&[0.001, 0.01, 0.1, 1.0])),
            ModelFamily::ElasticNet => ParamGrid::new()
                .with("alpha", floats(&[0.001, 0.01, 0.1, 1.0]))
                .with("l1_ratio", floats(&[0.2, 0.5, 0.8])),
            ModelFamily::SVR => ParamGrid::new()
                .with("kernel", texts(&["linear", "rbf"]))
                .with("C", floats(&[0.1, 1.0, 10.0]))
                .with("epsilon", floats(&[0.01, 0.1, 0.2])),
            ModelFamily::KNN => ParamGrid::new()
                .with("n_neighbors", ints(&[3, 5, 7]))
                .with("weights", texts(&["uniform", "distance"])),
            ModelFamily::DecisionTree => {
                ParamGrid::new().with("max_depth", depths(&[Some(3), Some(5), Some(10), None]))
            }
            ModelFamily::RandomForest => ParamGrid::new()
                .with("n_estimators", ints(&[50, 100]))
                .with("max_depth", depths(&[None, Some(5), Some(10)])),
            ModelFamily::GradientBoosting => ParamGrid::new()
                .with("n_estimators", ints(&[100, 300]))
                .with("learning_rate", floats(&[0.01, 0.05, 0.1]))
                .with("max_depth", ints(&[3, 5, 7]))
                .with("min_samples_split", ints(&[2, 5, 10])),
            ModelFamily::XGBoost => ParamGrid::new()
                .with("n_estimators", ints(&[100, 300]))
                .with("learning_rate", floats(&[0.01, 0.05, 0.1]))
                .with("max_depth", ints(&[3, 5, 7]))
                .with("min_child_weight", ints(&[1, 3]))
                .with("subsample", floats(&[0.8, 1.0]))
                .with("colsample_bytree", floats(&[0.8, 1.0])),
            ModelFamily::Huber => ParamGrid::new()
                .with("epsilon", floats(&[1.15, 1.35, 1.5]))
                .with("alpha", floats(&[0.0001, 0.001, 0.01])),
            ModelFamily::HistGBM => ParamGrid::new()
                .with("max_iter", ints(&[100, 200, 300]))
                .with("learning_rate", floats(&[0.01, 0.05, 0.1]))
                .with("max_depth", depths(&[Some(3), Some(5), None]))
                .with("min_samples_leaf", ints(&[20, 30, 50]))
                .with("l2_regularization", floats(&[0.0, 0.1, 0.5])),
        }
    }

    /// Unfitted model for one grid candidate
    pub fn build(&self, params: &HyperParams) -> Result<TrainedRegressor> {
        let model = match self {
            ModelFamily::LinearRegression => TrainedRegressor::Linear(
                LinearRegression::new().with_fit_intercept(get_bool(params, "fit_intercept")?),
            ),
            ModelFamily::Ridge => TrainedRegressor::Ridge(
                RidgeRegression::new(get_f64(params, "alpha")?)
                    .with_fit_intercept(get_bool(params, "fit_intercept")?),
            ),
            ModelFamily::Lasso => TrainedRegressor::Lasso(LassoRegression::new(get_f64(params, "alpha")?)),
            ModelFamily::ElasticNet => TrainedRegressor::ElasticNet(ElasticNetRegression::new(
                get_f64(params, "alpha")?,
                get_f64(params, "l1_ratio")?,
            )),
            ModelFamily::SVR => {
                let kernel = match params.get("kernel") {
                    Some(ParamValue::Text(s)) if s == "linear" => KernelType::Linear,
                    Some(ParamValue::Text(s)) if s == "rbf" => KernelType::Rbf,
                    other => return Err(invalid("kernel", other, "expected linear or rbf")),
                };
                TrainedRegressor::Svr(SVRRegressor::new(SVRConfig {
                    c: get_f64(params, "C")?,
                    kernel,
                    epsilon: get_f64(params, "epsilon")?,
                    ..Default::default()
                }))
            }
            ModelFamily::KNN => {
                let weights = match params.get("weights") {
                    Some(ParamValue::Text(s)) if s == "uniform" => WeightScheme::Uniform,
                    Some(ParamValue::Text(s)) if s == "distance" => WeightScheme::Distance,
                    other => return Err(invalid("weights", other, "expected uniform or distance")),
                };
                TrainedRegressor::Knn(
                    KNNRegressor::new(get_usize(params, "n_neighbors")?).with_weights(weights),
                )
            }
            ModelFamily::DecisionTree => TrainedRegressor::DecisionTree(
                DecisionTreeRegressor::new()
                    .with_max_depth(get_optional_usize(params, "max_depth")?)
                    .with_seed(MODEL_SEED),
            ),
            ModelFamily::RandomForest => TrainedRegressor::RandomForest(
                RandomForestRegressor::new(get_usize(params, "n_estimators")?)
                    .with_max_depth(get_optional_usize(params, "max_depth")?)
                    .with_random_state(MODEL_SEED),
            ),
            ModelFamily::GradientBoosting => TrainedRegressor::GradientBoosting(
                GradientBoostingRegressor::new(
                    get_usize(params, "n_estimators")?,
                    get_f64(params, "learning_rate")?,
                    get_usize(params, "max_depth")?,
                )
                .with_min_samples_split(get_usize(params, "min_samples_split")?)
                .with_random_state(MODEL_SEED),
            ),
            ModelFamily::XGBoost => TrainedRegressor::XGBoost(XGBoostRegressor::new(XGBoostConfig {
                n_estimators: get_usize(params, "n_estimators")?,
                learning_rate: get_f64(params, "learning_rate")?,
                max_depth: get_usize(params, "max_depth")?,
                min_child_weight: get_f64(params, "min_child_weight")?,
                subsample: get_f64(params, "subsample")?,
                colsample_bytree: get_f64(params, "colsample_bytree")?,
                random_state: MODEL_SEED,
                ..Default::default()
            })),
            ModelFamily::Huber => TrainedRegressor::Huber(HuberRegressor::new(
                get_f64(params, "epsilon")?,
                get_f64(params, "alpha")?,
            )),
            ModelFamily::HistGBM => TrainedRegressor::HistGbm(
                HistGradientBoostingRegressor::new(
                    get_usize(params, "max_iter")?,
                    get_f64(params, "learning_rate")?,
                )
                .with_max_depth(get_optional_usize(params, "max_depth")?)
                .with_min_samples_leaf(get_usize(params, "min_samples_leaf")?)
                .with_l2_regularization(get_f64(params, "l2_regularization")?)
                .with_random_state(MODEL_SEED),
            ),
        };
        Ok(model)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = SalaryError;

    fn from_str(s: &str) -> Result<Self> {
        ModelFamily::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SalaryError::ConfigError(format!("unknown model family '{}'", s)))
    }
}
