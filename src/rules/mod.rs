//! Per-seniority plausibility rules for experience and salary
//!
//! Pure data: the scoring logic lives in [`crate::preprocessing::outlier`].
//! Two independent tables exist, one per dimension, each keyed by
//! [`Seniority`]. Builtin tables come from [`tables`]; JSON overrides are
//! validated eagerly on load.

pub mod tables;

use crate::data::Seniority;
use crate::error::{Result, SalaryError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Closed interval `[lo, hi]`, serialized as a two-element array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ValueRange {
    pub lo: f64,
    pub hi: f64,
}

impl ValueRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Inclusive on both ends
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }

    pub fn is_within(&self, outer: &ValueRange) -> bool {
        self.lo >= outer.lo && self.hi <= outer.hi
    }
}

impl From<(f64, f64)> for ValueRange {
    fn from((lo, hi): (f64, f64)) -> Self {
        Self { lo, hi }
    }
}

impl From<ValueRange> for (f64, f64) {
    fn from(range: ValueRange) -> Self {
        (range.lo, range.hi)
    }
}

/// Years-of-experience rule for one seniority level.
///
/// For the senior tiers `critical_outlier < outlier_threshold`: too little
/// experience is the anomaly there, and `max_outlier` caps the upper end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRule {
    pub typical_range: ValueRange,
    pub acceptable_range: ValueRange,
    pub outlier_threshold: f64,
    pub critical_outlier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_outlier: Option<f64>,
}

/// Monthly salary (USD) rule for one seniority level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRule {
    pub typical_range: ValueRange,
    pub acceptable_range: ValueRange,
    pub outlier_range: ValueRange,
    pub critical_range: ValueRange,
}

/// Ranges shared by both rule kinds
pub trait BandedRule {
    fn typical_range(&self) -> ValueRange;
    fn acceptable_range(&self) -> ValueRange;

    /// Upper bound beyond which a value is always critical
    fn max_outlier(&self) -> Option<f64> {
        None
    }

    /// Every interval the rule declares, with a label for error messages
    fn ranges(&self) -> Vec<(&'static str, ValueRange)> {
        vec![
            ("typical_range", self.typical_range()),
            ("acceptable_range", self.acceptable_range()),
        ]
    }
}

impl BandedRule for ExperienceRule {
    fn typical_range(&self) -> ValueRange {
        self.typical_range
    }

    fn acceptable_range(&self) -> ValueRange {
        self.acceptable_range
    }

    fn max_outlier(&self) -> Option<f64> {
        self.max_outlier
    }
}

impl BandedRule for SalaryRule {
    fn typical_range(&self) -> ValueRange {
        self.typical_range
    }

    fn acceptable_range(&self) -> ValueRange {
        self.acceptable_range
    }

    fn ranges(&self) -> Vec<(&'static str, ValueRange)> {
        vec![
            ("typical_range", self.typical_range),
            ("acceptable_range", self.acceptable_range),
            ("outlier_range", self.outlier_range),
            ("critical_range", self.critical_range),
        ]
    }
}

/// One rule per seniority level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable<R> {
    entries: BTreeMap<Seniority, R>,
}

/// Experience rules keyed by seniority
pub type ExperienceRules = RuleTable<ExperienceRule>;
/// Salary rules keyed by seniority
pub type SalaryRules = RuleTable<SalaryRule>;

impl<R: BandedRule> RuleTable<R> {
    pub fn new(entries: BTreeMap<Seniority, R>) -> Self {
        Self { entries }
    }

    /// Rule for a level, `None` when the table has no entry
    pub fn get(&self, seniority: Seniority) -> Option<&R> {
        self.entries.get(&seniority)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Seniority, &R)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject inverted intervals and `typical_range ⊄ acceptable_range`
    pub fn validate(&self) -> Result<()> {
        for (seniority, rule) in &self.entries {
            for (name, range) in rule.ranges() {
                if !(range.lo <= range.hi) {
                    return Err(SalaryError::ConfigError(format!(
                        "{} rule: {} [{}, {}] is inverted",
                        seniority, name, range.lo, range.hi
                    )));
                }
            }
            let typical = rule.typical_range();
            let acceptable = rule.acceptable_range();
            if !typical.is_within(&acceptable) {
                return Err(SalaryError::ConfigError(format!(
                    "{} rule: typical_range [{}, {}] is not inside acceptable_range [{}, {}]",
                    seniority, typical.lo, typical.hi, acceptable.lo, acceptable.hi
                )));
            }
        }
        Ok(())
    }
}

impl<R: BandedRule + DeserializeOwned> RuleTable<R> {
    /// Load and validate a table from a JSON object keyed by seniority label
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SalaryError::ConfigError(format!("cannot read rules {}: {}", path.display(), e))
        })?;
        let table: Self = serde_json::from_str(&json)?;
        table.validate()?;
        Ok(table)
    }
}

/// Builtin experience table, or the validated override at `path`
pub fn load_experience_rules(path: Option<&Path>) -> Result<ExperienceRules> {
    match path {
        Some(p) => RuleTable::from_json_file(p),
        None => Ok(tables::experience_rules()),
    }
}

/// Builtin salary table, or the validated override at `path`
pub fn load_salary_rules(path: Option<&Path>) -> Result<SalaryRules> {
    match path {
        Some(p) => RuleTable::from_json_file(p),
        None => Ok(tables::salary_rules()),
    }
}
