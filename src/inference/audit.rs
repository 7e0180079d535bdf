//! Append-only CSV log of served predictions

use crate::error::Result;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// One line per prediction: the input features, `prediction`, `timestamp`.
/// The header is written only when the file is created; appends are
/// serialised so concurrent callers never interleave lines.
#[derive(Debug)]
pub struct PredictionAuditLog {
    path: PathBuf,
    columns: Vec<String>,
    lock: Mutex<()>,
}

impl PredictionAuditLog {
    pub fn new(path: impl Into<PathBuf>, feature_columns: Vec<String>) -> Self {
        Self {
            path: path.into(),
            columns: feature_columns,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record per `(features, prediction)` pair, all with the same
    /// UTC timestamp
    pub fn append(&self, rows: &[(Vec<String>, i64)]) -> Result<()> {
        let _guard = self.lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            let mut header: Vec<&str> = self.columns.iter().map(String::as_str).collect();
            header.push("prediction");
            header.push("timestamp");
            writer.write_record(&header)?;
        }

        let timestamp = Utc::now().to_rfc3339();
        for (features, prediction) in rows {
            let mut record = features.clone();
            record.push(prediction.to_string());
            record.push(timestamp.clone());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_header_written_once() {
        let dir = tempdir().unwrap();
        let log = PredictionAuditLog::new(
            dir.path().join("logs").join("prediction_log.csv"),
            vec!["job_category".to_string(), "experience_years".to_string()],
        );
        log.append(&[(vec!["QA".to_string(), "1".to_string()], 900)]).unwrap();
        log.append(&[(vec!["Backend".to_string(), "6".to_string()], 4100)]).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "job_category,experience_years,prediction,timestamp");
        assert!(lines[2].starts_with("Backend,6,4100,"));
    }
}
