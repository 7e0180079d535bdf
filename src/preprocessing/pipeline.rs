//! Column-wise feature preprocessing for the salary models
//!
//! Four branches, each followed by standard scaling, concatenated in a fixed
//! order: numeric, target-encoded, frequency-encoded, ordinal-encoded.

use super::encoder::{ColumnEncoder, FrequencyEncoder, OrdinalEncoder, TargetEncoder};
use super::scaler::StandardScaler;
use crate::config::PipelineConfig;
use crate::data::{columns, numeric_column};
use crate::error::{Result, SalaryError};
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// English proficiency, lowest to highest
pub const ENGLISH_LEVELS: [&str; 5] = [
    "Elementary",
    "Pre-Intermediate",
    "Intermediate",
    "Upper-Intermediate",
    "Advanced",
];

/// Numeric columns as a matrix. Nulls are rejected.
fn numeric_matrix(df: &DataFrame, cols: &[String]) -> Result<Array2<f64>> {
    let mut out = Array2::zeros((df.height(), cols.len()));
    for (j, name) in cols.iter().enumerate() {
        let values = numeric_column(df, name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    SalaryError::DataError(format!("null value in column '{}' at row {}", name, row))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        out.column_mut(j).assign(&Array1::from(values));
    }
    Ok(out)
}

fn as_strs(cols: &[String]) -> Vec<&str> {
    cols.iter().map(String::as_str).collect()
}

/// Fitted transformation from a feature frame to a model matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    numeric_columns: Vec<String>,
    target_columns: Vec<String>,
    frequency_columns: Vec<String>,
    ordinal_columns: Vec<String>,
    target_encoder: TargetEncoder,
    frequency_encoder: FrequencyEncoder,
    ordinal_encoder: OrdinalEncoder,
    numeric_scaler: StandardScaler,
    target_scaler: StandardScaler,
    frequency_scaler: StandardScaler,
    ordinal_scaler: StandardScaler,
    is_fitted: bool,
}

impl Default for FeaturePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturePreprocessor {
    /// Column assignment of the salary dataset with default encoder settings
    pub fn new() -> Self {
        Self {
            numeric_columns: vec![columns::EXPERIENCE_YEARS.to_string()],
            target_columns: vec![columns::SENIORITY_LEVEL.to_string()],
            frequency_columns: vec![columns::JOB_CATEGORY.to_string()],
            ordinal_columns: vec![columns::ENGLISH_LEVEL.to_string()],
            target_encoder: TargetEncoder::new(),
            frequency_encoder: FrequencyEncoder::new(),
            ordinal_encoder: OrdinalEncoder::new(ENGLISH_LEVELS),
            numeric_scaler: StandardScaler::new(),
            target_scaler: StandardScaler::new(),
            frequency_scaler: StandardScaler::new(),
            ordinal_scaler: StandardScaler::new(),
            is_fitted: false,
        }
    }

    /// Encoder settings from the pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut pre = Self::new();
        pre.target_encoder = TargetEncoder::new()
            .with_smoothing(config.encoder_smoothing)
            .with_cv(config.encoder_cv)
            .with_seed(config.encoder_seed);
        pre
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Output column names, in matrix order
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .chain(&self.target_columns)
            .chain(&self.frequency_columns)
            .chain(&self.ordinal_columns)
            .cloned()
            .collect()
    }

    /// Fit every branch; training rows get out-of-fold target encodings
    pub fn fit_transform(&mut self, df: &DataFrame, y: &Array1<f64>) -> Result<Array2<f64>> {
        let numeric = numeric_matrix(df, &self.numeric_columns)?;
        let numeric = self.numeric_scaler.fit_transform(&numeric)?;

        let target = self
            .target_encoder
            .fit_transform(df, &as_strs(&self.target_columns), Some(y))?;
        let target = self.target_scaler.fit_transform(&target)?;

        let frequency = self
            .frequency_encoder
            .fit_transform(df, &as_strs(&self.frequency_columns), None)?;
        let frequency = self.frequency_scaler.fit_transform(&frequency)?;

        let ordinal = self
            .ordinal_encoder
            .fit_transform(df, &as_strs(&self.ordinal_columns), None)?;
        let ordinal = self.ordinal_scaler.fit_transform(&ordinal)?;

        self.is_fitted = true;
        debug!(rows = df.height(), features = ?self.feature_names(), "Fitted preprocessor");

        Ok(concatenate(
            Axis(1),
            &[numeric.view(), target.view(), frequency.view(), ordinal.view()],
        )?)
    }

    /// Transform rows the preprocessor was not fitted on
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(SalaryError::ModelNotFitted);
        }

        let numeric = self
            .numeric_scaler
            .transform(&numeric_matrix(df, &self.numeric_columns)?)?;
        let target = self.target_scaler.transform(&self.target_encoder.transform(df)?)?;
        let frequency = self
            .frequency_scaler
            .transform(&self.frequency_encoder.transform(df)?)?;
        let ordinal = self
            .ordinal_scaler
            .transform(&self.ordinal_encoder.transform(df)?)?;

        Ok(concatenate(
            Axis(1),
            &[numeric.view(), target.view(), frequency.view(), ordinal.view()],
        )?)
    }
}
