//! Salary Estimator - IT salary estimation from survey data
//!
//! This crate covers the path from survey rows to a served salary estimate:
//! - Rule-based outlier scoring of experience and salary per seniority level
//! - Stratified downsampling of over-represented job categories
//! - Leakage-resistant categorical encoding (cross-validated target encoding,
//!   frequency and ordinal encoding)
//! - Grid search over a fixed catalog of regression families and selection of
//!   the best model on held-out data
//! - Inference-time validation against training-time snapshots, with an
//!   append-only audit log
//!
//! # Modules
//!
//! ## Core
//! - [`rules`] - Per-seniority rule tables
//! - [`preprocessing`] - Outlier scoring, balancing, encoders, scaling
//! - [`training`] - Regressors, grid search, model selection
//! - [`inference`] - Request validation, prediction, audit log
//!
//! ## Plumbing
//! - [`data`] - Typed rows, CSV loading, seniority standardization
//! - [`export`] - Model artifacts and configuration snapshots
//! - [`pipeline`] - End-to-end training run
//! - [`cli`] - Command-line interface
//! - [`config`], [`logging`], [`error`]

// Core error handling
pub mod error;

// Configuration and logging
pub mod config;
pub mod logging;

// Data and rules
pub mod data;
pub mod rules;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;

// Persistence and orchestration
pub mod export;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{Result, SalaryError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, SalaryError};

    // Configuration
    pub use crate::config::{AppConfig, PathsConfig, PipelineConfig};

    // Data and rules
    pub use crate::data::{CandidateRow, Seniority};
    pub use crate::rules::{ExperienceRules, SalaryRules, ValueRange};

    // Preprocessing
    pub use crate::preprocessing::{
        CategoryBalancer, ColumnEncoder, ExperienceScorer, FeaturePreprocessor, FrequencyEncoder,
        HandleUnknown, OutlierScore, SalaryScorer, TargetEncoder,
    };

    // Training
    pub use crate::training::{
        train_test_split, ModelFamily, Regressor, SalaryPipeline, TrainingOrchestrator,
    };

    // Inference
    pub use crate::inference::{InferenceValidator, PredictionRequest, SalaryPredictor};

    // Export
    pub use crate::export::{AllowedValuesConfig, FeatureTypesConfig, ModelArtifacts};
}
