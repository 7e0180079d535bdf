//! Integration test: full run, then guarded prediction with auditing

use ndarray::Array1;
use salary_estimator::config::AppConfig;
use salary_estimator::data::{rows_to_frame, CandidateRow, DataSaver, Seniority};
use salary_estimator::error::SalaryError;
use salary_estimator::export::{AllowedValuesConfig, FeatureTypesConfig, ModelArtifacts, ModelMetadata};
use salary_estimator::inference::{InferenceValidator, PredictionRequest, SalaryPredictor, Violation};
use salary_estimator::pipeline::{run, RunOptions};
use salary_estimator::preprocessing::FeaturePreprocessor;
use salary_estimator::training::{HyperParams, RidgeRegression, SalaryPipeline, TrainedRegressor};
use polars::prelude::*;
use std::path::Path;

const JOBS: [&str; 3] = ["Backend", "Frontend", "QA"];
const ENGLISH: [&str; 3] = ["Intermediate", "Upper-Intermediate", "Advanced"];

fn survey_rows() -> Vec<CandidateRow> {
    (0..90)
        .map(|i| {
            let offset = (i % 3) as f64 * 100.0;
            match i % 3 {
                0 => {
                    let exp = 0.5 + (i % 4) as f64 * 0.5;
                    CandidateRow::new(JOBS[i % 3], Seniority::Junior, ENGLISH[(i / 3) % 3], exp, 800.0 + exp * 200.0 + offset)
                }
                1 => {
                    let exp = 2.0 + (i % 6) as f64 * 0.5;
                    CandidateRow::new(JOBS[(i / 2) % 3], Seniority::Middle, ENGLISH[(i / 3) % 3], exp, 1700.0 + exp * 200.0 + offset)
                }
                _ => {
                    let exp = 4.0 + (i % 9) as f64 * 0.5;
                    CandidateRow::new(JOBS[(i / 3) % 3], Seniority::Senior, ENGLISH[(i / 3) % 3], exp, 3000.0 + exp * 150.0 + offset)
                }
            }
        })
        .collect()
}

/// Train into a fresh project root and return its config
fn trained_project(root: &Path) -> AppConfig {
    let input = root.join("survey.csv");
    let mut df = rows_to_frame(&survey_rows()).unwrap();
    DataSaver::save_csv(&mut df, &input).unwrap();

    let mut config = AppConfig::with_root(root);
    config.pipeline = config
        .pipeline
        .with_models(vec!["Ridge".to_string(), "KNN".to_string()]);
    let summary = run(&config, &RunOptions::new(&input)).unwrap();
    assert_eq!(summary.rows_loaded, 90);
    config
}

fn audit_lines(config: &AppConfig) -> usize {
    std::fs::read_to_string(config.paths.prediction_log_path())
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

fn request(job: &str) -> PredictionRequest {
    PredictionRequest {
        job_category: job.to_string(),
        seniority_level: "Senior".to_string(),
        english_level: "Advanced".to_string(),
        experience_years: 6.0,
    }
}

#[test]
fn test_valid_request_is_predicted_and_audited() {
    let dir = tempfile::tempdir().unwrap();
    let config = trained_project(dir.path());
    let predictor = SalaryPredictor::load(&config.paths).unwrap();

    let salary = predictor.predict_one(&request("Backend")).unwrap();
    assert!(salary >= 0);
    assert_eq!(audit_lines(&config), 2);

    let log = std::fs::read_to_string(config.paths.prediction_log_path()).unwrap();
    let mut lines = log.lines();
    assert_eq!(
        lines.next().unwrap(),
        "job_category,seniority_level,english_level,experience_years,prediction,timestamp"
    );
    let record = lines.next().unwrap();
    assert!(record.starts_with("Backend,Senior,Advanced,"));
    assert!(record.contains(&format!(",{},", salary)));

    predictor.predict_one(&request("QA")).unwrap();
    assert_eq!(audit_lines(&config), 3);
}

#[test]
fn test_unknown_category_is_rejected_without_audit() {
    let dir = tempfile::tempdir().unwrap();
    let config = trained_project(dir.path());
    let predictor = SalaryPredictor::load(&config.paths).unwrap();

    let err = predictor.predict_one(&request("Blockchain")).unwrap_err();
    let SalaryError::Validation(validation) = &err else {
        panic!("expected a validation error, got {:?}", err);
    };
    assert_eq!(
        validation.invalid_values("job_category"),
        Some(&["Blockchain".to_string()][..])
    );
    let message = err.to_string();
    assert!(message.contains("Blockchain"));
    assert!(message.contains("Backend"));
    assert_eq!(audit_lines(&config), 0);
}

#[test]
fn test_missing_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = trained_project(dir.path());
    let predictor = SalaryPredictor::load(&config.paths).unwrap();

    let df = df!(
        "job_category" => ["Backend"],
        "seniority_level" => ["Senior"],
        "experience_years" => [6.0]
    )
    .unwrap();
    let err = predictor.predict(&df).unwrap_err();
    let SalaryError::Validation(validation) = err else {
        panic!("expected a validation error");
    };
    assert!(validation.has_missing_columns());
    assert!(validation
        .violations
        .contains(&Violation::MissingColumns(vec!["english_level".to_string()])));
    assert_eq!(audit_lines(&config), 0);
}

#[test]
fn test_missing_artifacts_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::with_root(dir.path());
    let err = SalaryPredictor::load(&config.paths).unwrap_err();
    assert!(matches!(err, SalaryError::ConfigError(_)));
}

#[test]
fn test_negative_predictions_clamp_to_zero() {
    let rows = survey_rows();
    let features = rows_to_frame(&rows).unwrap().drop("salary_usd").unwrap();
    // fitted on negated salaries, so every raw prediction is below zero
    let y: Array1<f64> = rows.iter().map(|r| -r.salary_usd).collect();
    let mut pipeline = SalaryPipeline::new(
        FeaturePreprocessor::new(),
        TrainedRegressor::Ridge(RidgeRegression::new(1.0)),
    );
    pipeline.fit(&features, &y).unwrap();
    assert!(pipeline.predict(&features).unwrap().iter().all(|p| *p < 0.0));

    let validator = InferenceValidator::new(
        AllowedValuesConfig::from_frame(&features).unwrap(),
        FeatureTypesConfig::from_frame(&features, "salary_usd"),
    );
    let artifacts = ModelArtifacts::new(pipeline, ModelMetadata::new("Ridge", 0.0, HyperParams::new()));
    let dir = tempfile::tempdir().unwrap();
    let audit = dir.path().join("predictions.csv");
    let predictor = SalaryPredictor::new(artifacts, validator, audit.clone());

    assert_eq!(predictor.predict_one(&request("Backend")).unwrap(), 0);
    let log = std::fs::read_to_string(&audit).unwrap();
    let record = log.lines().nth(1).unwrap();
    assert!(record.starts_with("Backend,Senior,Advanced,"));
    assert!(record.contains(",0,"));
}
