//! Process-wide configuration
//!
//! Resolved once at startup (defaults, optionally overridden by a JSON file)
//! and passed by reference into every stage. Components never read paths or
//! settings from global state.

use crate::error::{Result, SalaryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Filesystem layout of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw and processed datasets
    pub data_dir: PathBuf,
    /// Persisted model artifacts
    pub models_dir: PathBuf,
    /// Allowed-values and feature-type snapshots
    pub configs_dir: PathBuf,
    /// Pipeline log and prediction audit log
    pub logs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::from_root(".")
    }
}

impl PathsConfig {
    /// Standard layout under a project root
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            models_dir: root.join("models"),
            configs_dir: root.join("configs"),
            logs_dir: root.join("logs"),
        }
    }

    /// Create every directory of the layout if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.models_dir, &self.configs_dir, &self.logs_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn processed_data_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("model_input.csv")
    }

    pub fn pipeline_log_path(&self) -> PathBuf {
        self.logs_dir.join("pipeline.log")
    }

    pub fn prediction_log_path(&self) -> PathBuf {
        self.logs_dir.join("prediction_log.csv")
    }

    pub fn allowed_values_path(&self) -> PathBuf {
        self.configs_dir.join("allowed_values.json")
    }

    pub fn feature_types_path(&self) -> PathBuf {
        self.configs_dir.join("column_features.json")
    }
}

/// Settings of the cleaning, encoding and training stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column holding the monthly salary
    pub target_column: String,
    /// Fraction of rows used for training
    pub train_size: f64,
    /// Seed of the train/test shuffle
    pub split_seed: u64,
    /// Job category -> target row count for the category balancer
    pub balance_targets: BTreeMap<String, usize>,
    /// Seed of the stratified downsampling
    pub balance_seed: u64,
    /// Folds used to score grid-search candidates
    pub cv_folds: usize,
    /// Smoothing strength of the target encoder
    pub encoder_smoothing: f64,
    /// Folds used by the target encoder's out-of-fold map
    pub encoder_cv: usize,
    /// Seed of the target encoder's fold shuffle
    pub encoder_seed: u64,
    /// Restrict training to these model families (catalog order is kept)
    pub model_filter: Option<Vec<String>>,
    /// JSON override for the experience rule table
    pub experience_rules: Option<PathBuf>,
    /// JSON override for the salary rule table
    pub salary_rules: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: "salary_usd".to_string(),
            train_size: 0.80,
            split_seed: 25,
            balance_targets: BTreeMap::new(),
            balance_seed: 42,
            cv_folds: 5,
            encoder_smoothing: 1.0,
            encoder_cv: 5,
            encoder_seed: 42,
            model_filter: None,
            experience_rules: None,
            salary_rules: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the training fraction
    pub fn with_train_size(mut self, train_size: f64) -> Self {
        self.train_size = train_size;
        self
    }

    /// Builder method to add a category to balance
    pub fn with_balance_target(mut self, category: impl Into<String>, count: usize) -> Self {
        self.balance_targets.insert(category.into(), count);
        self
    }

    /// Builder method to restrict the model catalog
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.model_filter = Some(models);
        self
    }

    /// Builder method to set grid-search folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Check ranges that would otherwise fail deep inside a stage
    pub fn validate(&self) -> Result<()> {
        if !(self.train_size > 0.0 && self.train_size < 1.0) {
            return Err(SalaryError::InvalidParameter {
                name: "train_size".to_string(),
                value: self.train_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if self.cv_folds < 2 {
            return Err(SalaryError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.encoder_cv < 2 {
            return Err(SalaryError::InvalidParameter {
                name: "encoder_cv".to_string(),
                value: self.encoder_cv.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.encoder_smoothing < 0.0 {
            return Err(SalaryError::InvalidParameter {
                name: "encoder_smoothing".to_string(),
                value: self.encoder_smoothing.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Defaults, or the JSON file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let json = std::fs::read_to_string(p).map_err(|e| {
                    SalaryError::ConfigError(format!("cannot read {}: {}", p.display(), e))
                })?;
                serde_json::from_str(&json)?
            }
            None => Self::default(),
        };
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Defaults rooted at a project directory
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            paths: PathsConfig::from_root(root),
            pipeline: PipelineConfig::default(),
        }
    }
}
