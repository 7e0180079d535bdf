//! Model selection over the catalog
//!
//! Each family is searched, refitted on the training split and evaluated on
//! both splits. A family that fails is logged and skipped. The winner is the
//! family with the highest rounded held-out R²; ties keep the earlier family
//! in catalog order.

use super::catalog::{HyperParams, ModelFamily};
use super::grid_search::GridSearch;
use super::models::{round_to, RegressionMetrics};
use super::pipeline::SalaryPipeline;
use super::split::DataBundle;
use crate::config::PipelineConfig;
use crate::error::{Result, SalaryError};
use crate::export::{ModelArtifacts, ModelMetadata};
use crate::preprocessing::FeaturePreprocessor;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Evaluation of one successfully trained family
#[derive(Debug, Clone)]
pub struct ModelResult {
    pub family: ModelFamily,
    pub params: HyperParams,
    pub cv_score: f64,
    pub train: RegressionMetrics,
    pub test: RegressionMetrics,
    pub training_time_secs: f64,
    pub pipeline: SalaryPipeline,
}

/// Outcome of a full training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Successful families in catalog order
    pub results: Vec<ModelResult>,
    /// Failed families with their error message
    pub failures: Vec<(ModelFamily, String)>,
    /// Index into `results` of the selected model
    pub best: usize,
}

impl TrainingReport {
    pub fn best(&self) -> &ModelResult {
        &self.results[self.best]
    }

    /// Human-readable comparison table, one row per split
    pub fn summary(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Salary Model Comparison ===\n\n");
        report.push_str(&format!(
            "{:<18} {:<6} {:>8} {:>8} {:>10} {:>10} {:>8}\n",
            "Model", "Split", "CV R²", "R²", "MAE", "RMSE", "MAE %"
        ));
        for r in &self.results {
            for (split, m) in [("train", &r.train), ("test", &r.test)] {
                report.push_str(&format!(
                    "{:<18} {:<6} {:>8.3} {:>8.2} {:>10.1} {:>10.1} {:>8.1}\n",
                    r.family.name(),
                    split,
                    r.cv_score,
                    m.r2,
                    m.mae,
                    m.rmse,
                    m.rel_mae
                ));
            }
        }
        for (family, reason) in &self.failures {
            report.push_str(&format!("{:<18} failed: {}\n", family.name(), reason));
        }

        let best = self.best();
        report.push_str(&format!(
            "\nBest model: {} (test R² {:.2})\n",
            best.family, best.test.r2
        ));
        for (name, value) in &best.params {
            report.push_str(&format!("  {:<20} {}\n", name, value));
        }
        report
    }
}

/// Runs the grid search of every catalog family and selects the winner
#[derive(Debug, Clone)]
pub struct TrainingOrchestrator {
    families: Vec<ModelFamily>,
    cv_folds: usize,
    preprocessor: FeaturePreprocessor,
}

impl TrainingOrchestrator {
    pub fn new(families: Vec<ModelFamily>) -> Self {
        Self {
            families,
            cv_folds: 5,
            preprocessor: FeaturePreprocessor::new(),
        }
    }

    /// Catalog restricted by the configured model filter
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let families = ModelFamily::catalog(config.model_filter.as_deref())?;
        Ok(Self {
            families,
            cv_folds: config.cv_folds,
            preprocessor: FeaturePreprocessor::from_config(config),
        })
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: FeaturePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn families(&self) -> &[ModelFamily] {
        &self.families
    }

    fn train_family(&self, family: ModelFamily, data: &DataBundle) -> Result<ModelResult> {
        let start = Instant::now();
        let search = GridSearch::new(family, self.preprocessor.clone()).with_cv_folds(self.cv_folds);
        let found = search.run(&data.x_train, &data.y_train)?;

        let train_pred = found.pipeline.predict(&data.x_train)?;
        let test_pred = found.pipeline.predict(&data.x_test)?;
        let train = RegressionMetrics::compute(&data.y_train, &train_pred)?;
        let test = RegressionMetrics::compute(&data.y_test, &test_pred)?;
        if !test.r2.is_finite() {
            return Err(SalaryError::ComputationError(format!(
                "{} produced a non-finite test R²",
                family
            )));
        }

        Ok(ModelResult {
            family,
            params: found.best_params,
            cv_score: found.best_score,
            train,
            test,
            training_time_secs: start.elapsed().as_secs_f64(),
            pipeline: found.pipeline,
        })
    }

    /// Train every family and select the best. When `save_dir` is given the
    /// winner is persisted there; nothing is written if no family succeeded.
    pub fn train(&self, data: &DataBundle, save_dir: Option<&Path>) -> Result<TrainingReport> {
        let mut results: Vec<ModelResult> = Vec::new();
        let mut failures = Vec::new();
        let mut best: Option<usize> = None;

        for &family in &self.families {
            info!(%family, "Training model");
            match self.train_family(family, data) {
                Ok(result) => {
                    info!(
                        %family,
                        train_r2 = result.train.r2,
                        train_mae = result.train.mae,
                        train_rmse = result.train.rmse,
                        train_rel_mae = result.train.rel_mae,
                        test_r2 = result.test.r2,
                        test_mae = result.test.mae,
                        test_rmse = result.test.rmse,
                        test_rel_mae = result.test.rel_mae,
                        secs = result.training_time_secs,
                        "Model evaluated"
                    );
                    let score = round_to(result.test.r2, 2);
                    if best.map_or(true, |b| score > round_to(results[b].test.r2, 2)) {
                        best = Some(results.len());
                    }
                    results.push(result);
                }
                Err(e) => {
                    error!(%family, error = %e, "Model training failed");
                    failures.push((family, e.to_string()));
                }
            }
        }

        let best = best.ok_or_else(|| {
            SalaryError::TrainingError(format!(
                "no model trained successfully ({} failed)",
                failures.len()
            ))
        })?;
        if !failures.is_empty() {
            warn!(failed = failures.len(), "Some model families were skipped");
        }

        let report = TrainingReport {
            results,
            failures,
            best,
        };
        let winner = report.best();
        info!(
            model = %winner.family,
            test_r2 = winner.test.r2,
            "Selected best model"
        );

        if let Some(dir) = save_dir {
            let metadata =
                ModelMetadata::new(winner.family.name(), winner.test.r2, winner.params.clone());
            ModelArtifacts::new(winner.pipeline.clone(), metadata).save(dir)?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_filters_catalog() {
        let config = PipelineConfig::default().with_models(vec![
            "Huber".to_string(),
            "LinearRegression".to_string(),
        ]);
        let orchestrator = TrainingOrchestrator::from_config(&config).unwrap();
        assert_eq!(
            orchestrator.families(),
            &[ModelFamily::LinearRegression, ModelFamily::Huber]
        );

        let bad = PipelineConfig::default().with_models(vec!["CatBoost".to_string()]);
        assert!(TrainingOrchestrator::from_config(&bad).is_err());
    }

    #[test]
    fn test_summary_reports_both_splits() {
        use crate::training::{LinearRegression, TrainedRegressor};

        let metrics = |r2, mae, rmse, rel_mae| RegressionMetrics {
            r2,
            mae,
            rmse,
            rel_mae,
        };
        let result = ModelResult {
            family: ModelFamily::Ridge,
            params: HyperParams::new(),
            cv_score: 0.9,
            train: metrics(0.97, 101.5, 150.2, 4.3),
            test: metrics(0.91, 180.4, 240.9, 7.6),
            training_time_secs: 0.1,
            pipeline: SalaryPipeline::new(
                FeaturePreprocessor::new(),
                TrainedRegressor::Linear(LinearRegression::new()),
            ),
        };
        let report = TrainingReport {
            results: vec![result],
            failures: vec![(ModelFamily::SVR, "boom".to_string())],
            best: 0,
        };

        let summary = report.summary();
        let train = summary.lines().find(|l| l.contains(" train ")).unwrap();
        for value in ["0.97", "101.5", "150.2", "4.3"] {
            assert!(train.contains(value), "{} not in {:?}", value, train);
        }
        let test = summary.lines().find(|l| l.contains(" test ")).unwrap();
        for value in ["0.91", "180.4", "240.9", "7.6"] {
            assert!(test.contains(value), "{} not in {:?}", value, test);
        }
        assert!(summary
            .lines()
            .any(|l| l.starts_with("SVR ") && l.ends_with("failed: boom")));
        assert!(summary.contains("Best model: Ridge (test R² 0.91)"));
    }
}
