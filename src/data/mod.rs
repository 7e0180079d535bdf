//! Candidate rows and their tabular representation
//!
//! The cleaning stages work on typed [`CandidateRow`]s; everything from the
//! train/test split onwards works on polars frames with the same columns.

mod loader;
mod seniority;

pub use loader::{DataLoader, DataSaver};
pub use seniority::Seniority;

use crate::error::{Result, SalaryError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Column names of the renamed, typed dataset
pub mod columns {
    pub const JOB_CATEGORY: &str = "job_category";
    pub const SENIORITY_LEVEL: &str = "seniority_level";
    pub const ENGLISH_LEVEL: &str = "english_level";
    pub const EXPERIENCE_YEARS: &str = "experience_years";
    pub const SALARY_USD: &str = "salary_usd";

    /// Columns that describe a candidate (everything but the target)
    pub const FEATURES: [&str; 4] = [JOB_CATEGORY, SENIORITY_LEVEL, ENGLISH_LEVEL, EXPERIENCE_YEARS];
}

/// One survey response after column renaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub job_category: String,
    pub seniority_level: Seniority,
    pub english_level: String,
    pub experience_years: f64,
    pub salary_usd: f64,
}

impl CandidateRow {
    pub fn new(
        job_category: impl Into<String>,
        seniority_level: Seniority,
        english_level: impl Into<String>,
        experience_years: f64,
        salary_usd: f64,
    ) -> Self {
        Self {
            job_category: job_category.into(),
            seniority_level,
            english_level: english_level.into(),
            experience_years,
            salary_usd,
        }
    }
}

/// Build a frame with the five dataset columns
pub fn rows_to_frame(rows: &[CandidateRow]) -> Result<DataFrame> {
    let job: Vec<&str> = rows.iter().map(|r| r.job_category.as_str()).collect();
    let seniority: Vec<&str> = rows.iter().map(|r| r.seniority_level.as_str()).collect();
    let english: Vec<&str> = rows.iter().map(|r| r.english_level.as_str()).collect();
    let experience: Vec<f64> = rows.iter().map(|r| r.experience_years).collect();
    let salary: Vec<f64> = rows.iter().map(|r| r.salary_usd).collect();

    let df = DataFrame::new(vec![
        Series::new(columns::JOB_CATEGORY.into(), job).into(),
        Series::new(columns::SENIORITY_LEVEL.into(), seniority).into(),
        Series::new(columns::ENGLISH_LEVEL.into(), english).into(),
        Series::new(columns::EXPERIENCE_YEARS.into(), experience).into(),
        Series::new(columns::SALARY_USD.into(), salary).into(),
    ])?;
    Ok(df)
}

/// Read typed rows back out of a frame.
///
/// Seniority titles are standardized on the way in. Rows with a missing
/// value in any of the five columns are skipped.
pub fn frame_to_rows(df: &DataFrame) -> Result<Vec<CandidateRow>> {
    let job = string_column(df, columns::JOB_CATEGORY)?;
    let seniority = string_column(df, columns::SENIORITY_LEVEL)?;
    let english = string_column(df, columns::ENGLISH_LEVEL)?;
    let experience = numeric_column(df, columns::EXPERIENCE_YEARS)?;
    let salary = numeric_column(df, columns::SALARY_USD)?;

    let mut rows = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for i in 0..df.height() {
        match (&job[i], &seniority[i], &english[i], experience[i], salary[i]) {
            (Some(j), Some(s), Some(e), Some(x), Some(y)) => {
                rows.push(CandidateRow::new(j.clone(), Seniority::from_title(s)?, e.clone(), x, y));
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped rows with missing values");
    }
    Ok(rows)
}

/// Remove rows whose seniority could not be determined
pub fn drop_unspecified(rows: Vec<CandidateRow>) -> Vec<CandidateRow> {
    rows.into_iter()
        .filter(|r| r.seniority_level.is_specified())
        .collect()
}

/// Values of a string column, `None` for nulls
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| SalaryError::FeatureNotFound(name.to_string()))?;
    let column = column.cast(&DataType::String)?;
    let ca = column.str()?;
    Ok(ca.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

/// Values of a numeric column as f64, `None` for nulls
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| SalaryError::FeatureNotFound(name.to_string()))?;
    let column = column.cast(&DataType::Float64)?;
    let ca = column.f64()?;
    Ok(ca.into_iter().collect())
}
