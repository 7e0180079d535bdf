//! Seniority levels and raw title standardization

use crate::error::{Result, SalaryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinal seniority level, the conditioning variable of the outlier rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seniority {
    Intern,
    Junior,
    Middle,
    Senior,
    Lead,
    #[serde(rename = "Staff+")]
    StaffPlus,
    Management,
    #[serde(rename = "C-level")]
    CLevel,
    #[serde(rename = "Not Specified")]
    NotSpecified,
}

impl Seniority {
    /// Every level that carries outlier rules, in ordinal order
    pub const RATED: [Seniority; 8] = [
        Seniority::Intern,
        Seniority::Junior,
        Seniority::Middle,
        Seniority::Senior,
        Seniority::Lead,
        Seniority::StaffPlus,
        Seniority::Management,
        Seniority::CLevel,
    ];

    /// Canonical label, as stored in the cleaned dataset
    pub fn as_str(&self) -> &'static str {
        match self {
            Seniority::Intern => "Intern",
            Seniority::Junior => "Junior",
            Seniority::Middle => "Middle",
            Seniority::Senior => "Senior",
            Seniority::Lead => "Lead",
            Seniority::StaffPlus => "Staff+",
            Seniority::Management => "Management",
            Seniority::CLevel => "C-level",
            Seniority::NotSpecified => "Not Specified",
        }
    }

    /// Map a survey title onto a level.
    ///
    /// Accepts both the raw survey titles and the canonical labels, so an
    /// already-standardized dataset passes through unchanged.
    pub fn from_title(title: &str) -> Result<Self> {
        let title = title.trim();
        let level = match title {
            "Intern/Trainee" | "Intern" => Seniority::Intern,
            "Junior" => Seniority::Junior,
            "Middle" => Seniority::Middle,
            "Senior" => Seniority::Senior,
            "Lead / Team Lead" | "Tech Lead" | "Lead" => Seniority::Lead,
            "Staff" | "Principal" | "Architect" | "Staff+" => Seniority::StaffPlus,
            "Manager" | "Head" | "Management" => Seniority::Management,
            "CEO / C-level (Chief) / Director / VP" | "C-level" => Seniority::CLevel,
            "Немає тайтлу" | "Not Specified" => Seniority::NotSpecified,
            other => {
                return Err(SalaryError::DataError(format!(
                    "unknown seniority title '{}'",
                    other
                )))
            }
        };
        Ok(level)
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self, Seniority::NotSpecified)
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Seniority {
    type Err = SalaryError;

    fn from_str(s: &str) -> Result<Self> {
        Seniority::from_title(s)
    }
}
