//! Persistence of trained artifacts and training-time configuration snapshots
//!
//! Everything here is pretty-printed JSON:
//! - `best_model.json`, `preprocessor.json`, `model_metadata.json` under the
//!   models directory
//! - `allowed_values.json`, `column_features.json` under the configs directory

mod artifacts;
mod snapshots;

pub use artifacts::{ModelArtifacts, ModelMetadata, BEST_MODEL_FILE, METADATA_FILE, PREPROCESSOR_FILE};
pub use snapshots::{AllowedValuesConfig, FeatureKind, FeatureTypesConfig, CATEGORICAL_COLUMNS};

use crate::error::{Result, SalaryError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path).map_err(|e| {
        SalaryError::DataError(format!("Failed to create {}: {}", path.display(), e))
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Missing files are reported as `ConfigError`
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(SalaryError::ConfigError(format!(
            "required file not found: {}",
            path.display()
        )));
    }
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
