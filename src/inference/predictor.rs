//! Guarded salary prediction

use super::audit::PredictionAuditLog;
use super::validator::InferenceValidator;
use crate::config::PathsConfig;
use crate::data::{columns, string_column};
use crate::error::Result;
use crate::export::{AllowedValuesConfig, FeatureTypesConfig, ModelArtifacts, ModelMetadata};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// A single prediction request as received by a serving layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub job_category: String,
    pub seniority_level: String,
    pub english_level: String,
    pub experience_years: f64,
}

impl PredictionRequest {
    pub fn to_frame(&self) -> Result<DataFrame> {
        let df = df!(
            columns::JOB_CATEGORY => [self.job_category.as_str()],
            columns::SENIORITY_LEVEL => [self.seniority_level.as_str()],
            columns::ENGLISH_LEVEL => [self.english_level.as_str()],
            columns::EXPERIENCE_YEARS => [self.experience_years]
        )?;
        Ok(df)
    }
}

/// Loaded model plus the validation and audit collaborators. Read-only after
/// construction, so a shared reference can serve concurrent requests.
#[derive(Debug)]
pub struct SalaryPredictor {
    artifacts: ModelArtifacts,
    validator: InferenceValidator,
    audit: PredictionAuditLog,
}

impl SalaryPredictor {
    pub fn new(
        artifacts: ModelArtifacts,
        validator: InferenceValidator,
        audit_path: impl Into<PathBuf>,
    ) -> Self {
        let audit = PredictionAuditLog::new(audit_path, validator.feature_columns().to_vec());
        Self {
            artifacts,
            validator,
            audit,
        }
    }

    /// Load artifacts and snapshots from the project layout. Any missing file
    /// is a `ConfigError`.
    pub fn load(paths: &PathsConfig) -> Result<Self> {
        let artifacts = ModelArtifacts::load(&paths.models_dir)?;
        let allowed = AllowedValuesConfig::load(&paths.allowed_values_path())?;
        let feature_types = FeatureTypesConfig::load(&paths.feature_types_path())?;
        info!(
            model = %artifacts.metadata.model_name,
            test_r2 = artifacts.metadata.test_r2,
            "Loaded predictor"
        );
        Ok(Self::new(
            artifacts,
            InferenceValidator::new(allowed, feature_types),
            paths.prediction_log_path(),
        ))
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.artifacts.metadata
    }

    pub fn validator(&self) -> &InferenceValidator {
        &self.validator
    }

    /// Validate, predict, round to whole dollars clamped at zero and append
    /// one audit line per row
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<i64>> {
        let features = self.validator.validate(df)?;
        let raw = self.artifacts.pipeline.predict(&features)?;
        let predictions: Vec<i64> = raw.iter().map(|p| p.round().max(0.0) as i64).collect();

        let columns = self
            .validator
            .feature_columns()
            .iter()
            .map(|c| string_column(&features, c))
            .collect::<Result<Vec<_>>>()?;
        let records: Vec<(Vec<String>, i64)> = predictions
            .iter()
            .enumerate()
            .map(|(row, &p)| {
                let values = columns
                    .iter()
                    .map(|col| col[row].clone().unwrap_or_default())
                    .collect();
                (values, p)
            })
            .collect();
        self.audit.append(&records)?;

        debug!(rows = predictions.len(), "Served predictions");
        Ok(predictions)
    }

    pub fn predict_one(&self, request: &PredictionRequest) -> Result<i64> {
        let predictions = self.predict(&request.to_frame()?)?;
        Ok(predictions.first().copied().unwrap_or_default())
    }
}
