//! Model training module
//!
//! Provides the regression side of the salary estimator:
//! - Linear models (OLS, Ridge, Lasso, ElasticNet, Huber)
//! - Epsilon-insensitive support vector regression
//! - K-Nearest Neighbors
//! - Decision trees, Random Forests and Gradient Boosting
//! - XGBoost-style and histogram-based boosting
//! - The fixed model catalog with its hyper-parameter grids
//! - K-fold grid search, train/test split and model selection

pub mod catalog;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
mod grid_search;
pub mod hist_gradient_boosting;
pub mod knn;
pub mod linear_models;
mod models;
mod orchestrator;
mod pipeline;
pub mod random_forest;
mod split;
pub mod svm;
pub mod xgboost;

pub use catalog::{HyperParams, ModelFamily, ParamGrid, ParamValue, MODEL_SEED};
pub use cross_validation::{CVResults, FoldSplit, KFold};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use gradient_boosting::GradientBoostingRegressor;
pub use grid_search::{CandidateScore, GridSearch, GridSearchResult};
pub use hist_gradient_boosting::HistGradientBoostingRegressor;
pub use knn::{KNNRegressor, WeightScheme};
pub use linear_models::{
    ElasticNetRegression, HuberRegressor, LassoRegression, LinearRegression, RidgeRegression,
};
pub use models::{r2_score, round_to, RegressionMetrics, Regressor};
pub use orchestrator::{ModelResult, TrainingOrchestrator, TrainingReport};
pub use pipeline::{SalaryPipeline, TrainedRegressor};
pub use random_forest::RandomForestRegressor;
pub use split::{take_rows, take_values, target_vector, train_test_split, DataBundle};
pub use svm::{KernelType, SVRConfig, SVRRegressor};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
