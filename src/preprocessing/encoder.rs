//! Categorical encoders
//!
//! Each encoder reads string columns out of a frame and produces one numeric
//! output column per input column, in the order the columns were given at
//! fit time.

use crate::data::string_column;
use crate::error::{Result, SalaryError};
use crate::training::cross_validation::KFold;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// What to do with a category that was not seen at fit time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HandleUnknown {
    /// Substitute a fixed value
    Value(f64),
    /// Fail with [`SalaryError::UnknownCategory`]
    Error,
}

impl Default for HandleUnknown {
    fn default() -> Self {
        HandleUnknown::Value(0.0)
    }
}

impl HandleUnknown {
    fn resolve(&self, column: &str, value: &str) -> Result<f64> {
        match self {
            HandleUnknown::Value(v) => Ok(*v),
            HandleUnknown::Error => Err(SalaryError::UnknownCategory {
                column: column.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// A fit/transform step over categorical columns
pub trait ColumnEncoder {
    /// Learn the encoding. `target` is required by supervised encoders only.
    fn fit(
        &mut self,
        df: &DataFrame,
        columns: &[&str],
        target: Option<&Array1<f64>>,
    ) -> Result<&mut Self>;

    /// Encode with the fitted mapping
    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>>;

    /// Encode the rows the encoder is fitted on
    fn fit_transform(
        &mut self,
        df: &DataFrame,
        columns: &[&str],
        target: Option<&Array1<f64>>,
    ) -> Result<Array2<f64>> {
        self.fit(df, columns, target)?;
        self.transform(df)
    }

    /// Input columns, in output order
    fn columns(&self) -> &[String];
}

/// Category values of a column. Nulls are rejected.
fn category_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    string_column(df, column)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                SalaryError::DataError(format!("null value in column '{}' at row {}", column, row))
            })
        })
        .collect()
}

fn assemble(n_rows: usize, encoded: Vec<Vec<f64>>) -> Array2<f64> {
    let mut out = Array2::zeros((n_rows, encoded.len()));
    for (j, values) in encoded.into_iter().enumerate() {
        out.column_mut(j).assign(&Array1::from(values));
    }
    out
}

fn require_fitted(is_fitted: bool) -> Result<()> {
    if is_fitted {
        Ok(())
    } else {
        Err(SalaryError::ModelNotFitted)
    }
}

/// Smoothed per-category means over a subset of rows, and that subset's mean
fn smoothed_means(
    values: &[String],
    target: &Array1<f64>,
    rows: &[usize],
    smoothing: f64,
) -> (HashMap<String, f64>, f64) {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    let mut total = 0.0;
    for &i in rows {
        let entry = sums.entry(values[i].as_str()).or_insert((0.0, 0));
        entry.0 += target[i];
        entry.1 += 1;
        total += target[i];
    }
    let global = total / rows.len().max(1) as f64;

    let means = sums
        .into_iter()
        .map(|(category, (sum, count))| {
            let n = count as f64;
            let mean = sum / n;
            (category.to_string(), (n * mean + smoothing * global) / (n + smoothing))
        })
        .collect();
    (means, global)
}

/// Smoothed target-mean encoder with out-of-fold training encodings.
///
/// `fit` builds two maps per column: a basic category → mean map over every
/// row, used by `transform`, and a per-row map in which each row is encoded
/// from the other folds only, used by `fit_transform`. Training features
/// therefore never see their own target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEncoder {
    smoothing: f64,
    cv: usize,
    seed: u64,
    handle_unknown: HandleUnknown,
    columns: Vec<String>,
    global_mean: f64,
    mappings: BTreeMap<String, BTreeMap<String, f64>>,
    /// Out-of-fold encodings of the fit rows, by row position
    #[serde(skip)]
    cv_encodings: BTreeMap<String, Vec<Option<f64>>>,
    is_fitted: bool,
}

impl Default for TargetEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetEncoder {
    pub fn new() -> Self {
        Self {
            smoothing: 1.0,
            cv: 5,
            seed: 42,
            handle_unknown: HandleUnknown::default(),
            columns: Vec::new(),
            global_mean: 0.0,
            mappings: BTreeMap::new(),
            cv_encodings: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Weight of the global mean, in rows
    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// Basic (full-data) encoding of a category
    pub fn mapping(&self, column: &str, category: &str) -> Option<f64> {
        self.mappings.get(column)?.get(category).copied()
    }

    fn validate_params(&self) -> Result<()> {
        if !(self.smoothing >= 0.0) {
            return Err(SalaryError::InvalidParameter {
                name: "smoothing".to_string(),
                value: self.smoothing.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

impl ColumnEncoder for TargetEncoder {
    fn fit(
        &mut self,
        df: &DataFrame,
        columns: &[&str],
        target: Option<&Array1<f64>>,
    ) -> Result<&mut Self> {
        let target = target.ok_or_else(|| {
            SalaryError::ConfigError("target encoding requires a target".to_string())
        })?;
        self.validate_params()?;

        let n = df.height();
        if target.len() != n {
            return Err(SalaryError::ShapeError {
                expected: format!("{} target values", n),
                actual: format!("{}", target.len()),
            });
        }

        let folds = KFold::new(self.cv).shuffled(self.seed).split(n)?;
        let all_rows: Vec<usize> = (0..n).collect();

        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.mappings.clear();
        self.cv_encodings.clear();

        self.global_mean = target.mean().unwrap_or(0.0);

        for column in columns {
            let values = category_values(df, column)?;

            let (basic, _) = smoothed_means(&values, target, &all_rows, self.smoothing);
            self.mappings
                .insert(column.to_string(), basic.into_iter().collect());

            let mut encoded = vec![None; n];
            for fold in &folds {
                let (fold_map, fold_global) =
                    smoothed_means(&values, target, &fold.train_indices, self.smoothing);
                for &i in &fold.test_indices {
                    encoded[i] = Some(fold_map.get(&values[i]).copied().unwrap_or(fold_global));
                }
            }
            self.cv_encodings.insert(column.to_string(), encoded);
        }

        debug!(
            columns = ?self.columns,
            folds = self.cv,
            global_mean = self.global_mean,
            "Fitted target encoder"
        );
        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        require_fitted(self.is_fitted)?;

        let mut encoded = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = category_values(df, column)?;
            let mapping = self.mappings.get(column);
            let out = values
                .iter()
                .map(|v| match mapping.and_then(|m| m.get(v)) {
                    Some(mean) => Ok(*mean),
                    None => self.handle_unknown.resolve(column, v),
                })
                .collect::<Result<Vec<f64>>>()?;
            encoded.push(out);
        }
        Ok(assemble(df.height(), encoded))
    }

    /// Out-of-fold encodings for the fit rows, falling back to the basic map
    /// and then the global mean
    fn fit_transform(
        &mut self,
        df: &DataFrame,
        columns: &[&str],
        target: Option<&Array1<f64>>,
    ) -> Result<Array2<f64>> {
        self.fit(df, columns, target)?;

        let mut encoded = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = category_values(df, column)?;
            let cv = self.cv_encodings.get(column);
            let basic = self.mappings.get(column);
            let out = values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    cv.and_then(|c| c.get(i).copied().flatten())
                        .or_else(|| basic.and_then(|m| m.get(v).copied()))
                        .unwrap_or(self.global_mean)
                })
                .collect();
            encoded.push(out);
        }
        Ok(assemble(df.height(), encoded))
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Replaces each category with its fit-time occurrence count
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrequencyEncoder {
    handle_unknown: HandleUnknown,
    columns: Vec<String>,
    counts: BTreeMap<String, BTreeMap<String, usize>>,
    is_fitted: bool,
}

impl FrequencyEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    pub fn count(&self, column: &str, category: &str) -> Option<usize> {
        self.counts.get(column)?.get(category).copied()
    }
}

impl ColumnEncoder for FrequencyEncoder {
    fn fit(
        &mut self,
        df: &DataFrame,
        columns: &[&str],
        _target: Option<&Array1<f64>>,
    ) -> Result<&mut Self> {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.counts.clear();

        for column in columns {
            let mut counts = BTreeMap::new();
            for v in category_values(df, column)? {
                *counts.entry(v).or_insert(0usize) += 1;
            }
            self.counts.insert(column.to_string(), counts);
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        require_fitted(self.is_fitted)?;

        let mut encoded = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let counts = self.counts.get(column);
            let out = category_values(df, column)?
                .iter()
                .map(|v| match counts.and_then(|c| c.get(v)) {
                    Some(count) => Ok(*count as f64),
                    None => self.handle_unknown.resolve(column, v),
                })
                .collect::<Result<Vec<f64>>>()?;
            encoded.push(out);
        }
        Ok(assemble(df.height(), encoded))
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Maps categories to their position in a fixed ordering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    categories: Vec<String>,
    handle_unknown: HandleUnknown,
    columns: Vec<String>,
    is_fitted: bool,
}

impl OrdinalEncoder {
    /// `categories` lists the levels from lowest to highest
    pub fn new<S: Into<String>>(categories: impl IntoIterator<Item = S>) -> Self {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            handle_unknown: HandleUnknown::Error,
            columns: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    fn encode_column(&self, df: &DataFrame, column: &str) -> Result<Vec<f64>> {
        category_values(df, column)?
            .iter()
            .map(|v| match self.categories.iter().position(|c| c == v) {
                Some(rank) => Ok(rank as f64),
                None => self.handle_unknown.resolve(column, v),
            })
            .collect()
    }
}

impl ColumnEncoder for OrdinalEncoder {
    /// Checks that every value is a known level
    fn fit(
        &mut self,
        df: &DataFrame,
        columns: &[&str],
        _target: Option<&Array1<f64>>,
    ) -> Result<&mut Self> {
        for column in columns {
            self.encode_column(df, column)?;
        }
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        require_fitted(self.is_fitted)?;
        let encoded = self
            .columns
            .iter()
            .map(|c| self.encode_column(df, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(assemble(df.height(), encoded))
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn frame() -> DataFrame {
        df!("level" => &["A", "A", "B", "B", "B", "C"]).unwrap()
    }

    #[test]
    fn test_target_smoothing_formula() {
        let df = frame();
        let y = array![1.0, 3.0, 10.0, 10.0, 10.0, 6.0];
        let mut enc = TargetEncoder::new().with_smoothing(2.0).with_cv(2);
        enc.fit(&df, &["level"], Some(&y)).unwrap();

        let global = 40.0 / 6.0;
        let expected_a = (2.0 * 2.0 + 2.0 * global) / 4.0;
        assert!((enc.mapping("level", "A").unwrap() - expected_a).abs() < 1e-9);
        assert!((enc.global_mean() - global).abs() < 1e-9);
    }

    #[test]
    fn test_target_requires_target() {
        let mut enc = TargetEncoder::new();
        let err = enc.fit(&frame(), &["level"], None).unwrap_err();
        assert!(matches!(err, SalaryError::ConfigError(_)));
    }

    #[test]
    fn test_target_unknown_category() {
        let y = array![1.0, 3.0, 10.0, 10.0, 10.0, 6.0];
        let mut enc = TargetEncoder::new().with_cv(2);
        enc.fit(&frame(), &["level"], Some(&y)).unwrap();

        let unseen = df!("level" => &["Z"]).unwrap();
        assert_eq!(enc.transform(&unseen).unwrap()[[0, 0]], 0.0);

        let strict = enc.clone().with_handle_unknown(HandleUnknown::Error);
        assert!(matches!(
            strict.transform(&unseen),
            Err(SalaryError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_target_fewer_rows_than_folds() {
        let y = array![1.0, 2.0];
        let df = df!("level" => &["A", "B"]).unwrap();
        let mut enc = TargetEncoder::new();
        assert!(matches!(
            enc.fit(&df, &["level"], Some(&y)),
            Err(SalaryError::ConfigError(_))
        ));
    }

    #[test]
    fn test_frequency_counts() {
        let df = df!("cat" => &["X", "X", "Y", "X"]).unwrap();
        let mut enc = FrequencyEncoder::new();
        let out = enc.fit_transform(&df, &["cat"], None).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![3.0, 3.0, 1.0, 3.0]);

        let unseen = df!("cat" => &["Z"]).unwrap();
        assert_eq!(enc.transform(&unseen).unwrap()[[0, 0]], 0.0);
    }

    #[test]
    fn test_ordinal_rejects_unknown_level() {
        let mut enc = OrdinalEncoder::new(["Low", "Mid", "High"]);
        let df = df!("lvl" => &["High", "Low"]).unwrap();
        let out = enc.fit_transform(&df, &["lvl"], None).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![2.0, 0.0]);

        let bad = df!("lvl" => &["Fluent"]).unwrap();
        assert!(matches!(
            enc.transform(&bad),
            Err(SalaryError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_transform_before_fit() {
        let enc = FrequencyEncoder::new();
        assert!(matches!(enc.transform(&frame()), Err(SalaryError::ModelNotFitted)));
    }
}
