//! Data cleaning and feature preprocessing
//!
//! - Rule-based outlier scoring of experience and salary
//! - Stratified category balancing
//! - Categorical encoding (target, frequency, ordinal)
//! - Standard scaling and the column-wise feature preprocessor

mod balancer;
pub mod encoder;
pub mod outlier;
mod pipeline;
mod scaler;

pub use balancer::CategoryBalancer;
pub use encoder::{ColumnEncoder, FrequencyEncoder, HandleUnknown, OrdinalEncoder, TargetEncoder};
pub use outlier::{
    score_value, Dimension, ExperienceScorer, OutlierRule, OutlierScore, OutlierScorer,
    PassSummary, SalaryScorer, ScoreReason, ScoredValue,
};
pub use pipeline::{FeaturePreprocessor, ENGLISH_LEVELS};
pub use scaler::StandardScaler;
