//! Category domains and feature types captured from the cleaned training frame

use super::{read_json, write_json};
use crate::data::{columns, string_column};
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Categorical columns whose legal values are recorded
pub const CATEGORICAL_COLUMNS: [&str; 3] = [
    columns::JOB_CATEGORY,
    columns::SENIORITY_LEVEL,
    columns::ENGLISH_LEVEL,
];

/// Column -> allowed values, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedValuesConfig {
    values: BTreeMap<String, Vec<String>>,
}

impl AllowedValuesConfig {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut values = BTreeMap::new();
        for column in CATEGORICAL_COLUMNS {
            let mut seen: Vec<String> = Vec::new();
            for value in string_column(df, column)?.into_iter().flatten() {
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
            values.insert(column.to_string(), seen);
        }
        Ok(Self { values })
    }

    pub fn with_column(mut self, column: impl Into<String>, allowed: Vec<String>) -> Self {
        self.values.insert(column.into(), allowed);
        self
    }

    pub fn allowed(&self, column: &str) -> Option<&[String]> {
        self.values.get(column).map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// Declared feature columns and their kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTypesConfig {
    pub columns: Vec<String>,
    pub types: BTreeMap<String, FeatureKind>,
}

impl FeatureTypesConfig {
    /// Every column but `target`, typed by its dtype
    pub fn from_frame(df: &DataFrame, target: &str) -> Self {
        let mut config = Self::default();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == target {
                continue;
            }
            let dtype = column.dtype();
            let kind = if dtype.is_float() || dtype.is_integer() {
                FeatureKind::Numeric
            } else {
                FeatureKind::Categorical
            };
            config = config.with_feature(name, kind);
        }
        config
    }

    pub fn with_feature(mut self, column: impl Into<String>, kind: FeatureKind) -> Self {
        let column = column.into();
        if !self.columns.contains(&column) {
            self.columns.push(column.clone());
        }
        self.types.insert(column, kind);
        self
    }

    pub fn kind(&self, column: &str) -> Option<FeatureKind> {
        self.types.get(column).copied()
    }

    pub fn categorical(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| self.kind(c) == Some(FeatureKind::Categorical))
            .map(String::as_str)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}
