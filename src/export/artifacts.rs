//! Trained pipeline, fitted preprocessor and metadata of the selected model

use super::{read_json, write_json};
use crate::error::Result;
use crate::preprocessing::FeaturePreprocessor;
use crate::training::{HyperParams, SalaryPipeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const BEST_MODEL_FILE: &str = "best_model.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Description of the persisted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    /// Held-out R², 2 decimals
    pub test_r2: f64,
    pub params: HyperParams,
    pub trained_at: DateTime<Utc>,
}

impl ModelMetadata {
    pub fn new(model_name: impl Into<String>, test_r2: f64, params: HyperParams) -> Self {
        Self {
            model_name: model_name.into(),
            test_r2,
            params,
            trained_at: Utc::now(),
        }
    }
}

/// The three files written by a training run and loaded together at serving
/// start
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub pipeline: SalaryPipeline,
    pub preprocessor: FeaturePreprocessor,
    pub metadata: ModelMetadata,
}

impl ModelArtifacts {
    pub fn new(pipeline: SalaryPipeline, metadata: ModelMetadata) -> Self {
        let preprocessor = pipeline.preprocessor().clone();
        Self {
            pipeline,
            preprocessor,
            metadata,
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        write_json(&dir.join(BEST_MODEL_FILE), &self.pipeline)?;
        write_json(&dir.join(PREPROCESSOR_FILE), &self.preprocessor)?;
        write_json(&dir.join(METADATA_FILE), &self.metadata)?;
        info!(
            dir = %dir.display(),
            model = %self.metadata.model_name,
            test_r2 = self.metadata.test_r2,
            "Saved model artifacts"
        );
        Ok(())
    }

    /// Load all three files; any missing one is a `ConfigError`
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            pipeline: read_json(&dir.join(BEST_MODEL_FILE))?,
            preprocessor: read_json(&dir.join(PREPROCESSOR_FILE))?,
            metadata: read_json(&dir.join(METADATA_FILE))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SalaryError;
    use crate::training::{ParamValue, RidgeRegression, TrainedRegressor};
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempdir().unwrap();
        let pipeline = SalaryPipeline::new(
            FeaturePreprocessor::new(),
            TrainedRegressor::Ridge(RidgeRegression::new(1.0)),
        );
        let mut params = HyperParams::new();
        params.insert("alpha".to_string(), ParamValue::Float(1.0));
        ModelArtifacts::new(pipeline, ModelMetadata::new("Ridge", 0.81, params.clone()))
            .save(dir.path())
            .unwrap();

        let loaded = ModelArtifacts::load(dir.path()).unwrap();
        assert_eq!(loaded.metadata.model_name, "Ridge");
        assert_eq!(loaded.metadata.params, params);

        std::fs::remove_file(dir.path().join(PREPROCESSOR_FILE)).unwrap();
        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(SalaryError::ConfigError(_))
        ));
    }
}
