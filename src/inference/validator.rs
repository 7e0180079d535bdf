//! Request validation against the training-time snapshots

use crate::data::string_column;
use crate::error::Result;
use crate::export::{AllowedValuesConfig, FeatureTypesConfig};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One failed check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    /// Declared feature columns absent from the request
    MissingColumns(Vec<String>),
    /// Declared feature columns holding nulls
    MissingValues(Vec<String>),
    /// Values outside a categorical column's training domain
    InvalidValues {
        column: String,
        invalid: Vec<String>,
        allowed: Vec<String>,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingColumns(cols) => write!(f, "missing columns: {}", cols.join(", ")),
            Violation::MissingValues(cols) => {
                write!(f, "missing values in columns: {}", cols.join(", "))
            }
            Violation::InvalidValues {
                column,
                invalid,
                allowed,
            } => write!(
                f,
                "invalid values in '{}': [{}]; allowed values: [{}]",
                column,
                invalid.join(", "),
                allowed.join(", ")
            ),
        }
    }
}

/// Every violation found in a request
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Input validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn has_missing_columns(&self) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, Violation::MissingColumns(_)))
    }

    /// Invalid values reported for `column`, if any
    pub fn invalid_values(&self, column: &str) -> Option<&[String]> {
        self.violations.iter().find_map(|v| match v {
            Violation::InvalidValues {
                column: c, invalid, ..
            } if c == column => Some(invalid.as_slice()),
            _ => None,
        })
    }
}

/// Replays the structural, completeness and domain checks used to build the
/// training features
#[derive(Debug, Clone)]
pub struct InferenceValidator {
    allowed: AllowedValuesConfig,
    feature_types: FeatureTypesConfig,
}

impl InferenceValidator {
    pub fn new(allowed: AllowedValuesConfig, feature_types: FeatureTypesConfig) -> Self {
        Self {
            allowed,
            feature_types,
        }
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_types.columns
    }

    pub fn allowed_values(&self) -> &AllowedValuesConfig {
        &self.allowed
    }

    /// Collect all violations. Columns missing from the request are not
    /// inspected further.
    pub fn violations(&self, df: &DataFrame) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();
        let present: Vec<&String> = self
            .feature_types
            .columns
            .iter()
            .filter(|c| df.column(c).is_ok())
            .collect();

        let missing: Vec<String> = self
            .feature_types
            .columns
            .iter()
            .filter(|c| !present.contains(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            violations.push(Violation::MissingColumns(missing));
        }

        let mut with_nulls = Vec::new();
        for column in &present {
            if df.column(column)?.null_count() > 0 {
                with_nulls.push((*column).clone());
            }
        }
        if !with_nulls.is_empty() {
            violations.push(Violation::MissingValues(with_nulls));
        }

        for column in self.feature_types.categorical() {
            // a categorical column without a recorded domain accepts nothing
            let allowed = self.allowed.allowed(column).unwrap_or(&[]);
            if !present.iter().any(|c| c.as_str() == column) {
                continue;
            }
            let mut invalid: Vec<String> = Vec::new();
            for value in string_column(df, column)?.into_iter().flatten() {
                if !allowed.contains(&value) && !invalid.contains(&value) {
                    invalid.push(value);
                }
            }
            if !invalid.is_empty() {
                violations.push(Violation::InvalidValues {
                    column: column.to_string(),
                    invalid,
                    allowed: allowed.to_vec(),
                });
            }
        }

        Ok(violations)
    }

    /// The declared feature columns of a request that passes every check
    pub fn validate(&self, df: &DataFrame) -> Result<DataFrame> {
        let violations = self.violations(df)?;
        if !violations.is_empty() {
            return Err(ValidationError { violations }.into());
        }
        Ok(df.select(self.feature_types.columns.iter().map(String::as_str))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SalaryError;
    use crate::export::FeatureKind;

    fn validator() -> InferenceValidator {
        let allowed = AllowedValuesConfig::default()
            .with_column("job_category", vec!["Backend".into(), "QA".into()])
            .with_column("seniority_level", vec!["Junior".into(), "Senior".into()]);
        let types = FeatureTypesConfig::default()
            .with_feature("job_category", FeatureKind::Categorical)
            .with_feature("seniority_level", FeatureKind::Categorical)
            .with_feature("experience_years", FeatureKind::Numeric);
        InferenceValidator::new(allowed, types)
    }

    #[test]
    fn test_valid_request_selects_declared_columns() {
        let df = df!(
            "extra" => &[1],
            "experience_years" => &[6.0],
            "seniority_level" => &["Senior"],
            "job_category" => &["Backend"]
        )
        .unwrap();
        let out = validator().validate(&df).unwrap();
        let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["job_category", "seniority_level", "experience_years"]);
    }

    #[test]
    fn test_missing_column_is_structural() {
        let df = df!("job_category" => &["QA"], "seniority_level" => &["Junior"]).unwrap();
        let err = validator().violations(&df).unwrap();
        assert_eq!(
            err,
            vec![Violation::MissingColumns(vec!["experience_years".to_string()])]
        );
    }

    #[test]
    fn test_unknown_value_names_value_and_domain() {
        let df = df!(
            "job_category" => &["Golang", "QA", "Golang"],
            "seniority_level" => &["Senior", "Junior", "Senior"],
            "experience_years" => &[4.0, 1.0, 5.0]
        )
        .unwrap();
        match validator().validate(&df) {
            Err(SalaryError::Validation(e)) => {
                assert_eq!(e.invalid_values("job_category").unwrap(), &["Golang".to_string()]);
                let msg = e.to_string();
                assert!(msg.contains("Golang"));
                assert!(msg.contains("Backend, QA"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_nulls_are_reported() {
        let df = df!(
            "job_category" => &[Some("QA")],
            "seniority_level" => &[Some("Junior")],
            "experience_years" => &[None::<f64>]
        )
        .unwrap();
        let violations = validator().violations(&df).unwrap();
        assert_eq!(
            violations,
            vec![Violation::MissingValues(vec!["experience_years".to_string()])]
        );
    }

    #[test]
    fn test_column_without_domain_rejects_every_value() {
        let allowed = AllowedValuesConfig::default()
            .with_column("job_category", vec!["Backend".into(), "QA".into()]);
        let types = FeatureTypesConfig::default()
            .with_feature("job_category", FeatureKind::Categorical)
            .with_feature("seniority_level", FeatureKind::Categorical);
        let df = df!("job_category" => &["QA"], "seniority_level" => &["Astronaut"]).unwrap();

        let violations = InferenceValidator::new(allowed, types).violations(&df).unwrap();
        assert_eq!(
            violations,
            vec![Violation::InvalidValues {
                column: "seniority_level".to_string(),
                invalid: vec!["Astronaut".to_string()],
                allowed: vec![],
            }]
        );
    }

    #[test]
    fn test_all_violations_reported_together() {
        let df = df!(
            "job_category" => &[Some("Golang"), None, Some("QA")],
            "experience_years" => &[Some(4.0), Some(1.0), Some(2.0)]
        )
        .unwrap();
        let err = validator().validate(&df).unwrap_err();
        let SalaryError::Validation(e) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            e.violations,
            vec![
                Violation::MissingColumns(vec!["seniority_level".to_string()]),
                Violation::MissingValues(vec!["job_category".to_string()]),
                Violation::InvalidValues {
                    column: "job_category".to_string(),
                    invalid: vec!["Golang".to_string()],
                    allowed: vec!["Backend".to_string(), "QA".to_string()],
                },
            ]
        );
        let msg = e.to_string();
        assert!(msg.contains("missing columns: seniority_level"));
        assert!(msg.contains("missing values in columns: job_category"));
        assert!(msg.contains("Golang"));
    }
}
