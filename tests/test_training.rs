//! Integration test: split, grid search and model selection

use salary_estimator::config::PipelineConfig;
use salary_estimator::data::{rows_to_frame, CandidateRow, Seniority};
use salary_estimator::error::SalaryError;
use salary_estimator::export::{ModelArtifacts, BEST_MODEL_FILE, METADATA_FILE, PREPROCESSOR_FILE};
use salary_estimator::training::{round_to, train_test_split, ModelFamily, TrainingOrchestrator};

const JOBS: [&str; 4] = ["Backend", "Frontend", "QA", "DevOps"];
const ENGLISH: [&str; 5] = [
    "Elementary",
    "Pre-Intermediate",
    "Intermediate",
    "Upper-Intermediate",
    "Advanced",
];

/// Rows that sit inside the typical bands, with salary driven by level and
/// experience
fn survey_rows(n: usize) -> Vec<CandidateRow> {
    (0..n)
        .map(|i| {
            let job_offset = (i % 4) as f64 * 50.0;
            let (level, experience, salary) = match i % 3 {
                0 => {
                    let exp = 0.5 + (i % 5) as f64 * 0.5;
                    (Seniority::Junior, exp, 700.0 + exp * 250.0 + job_offset)
                }
                1 => {
                    let exp = 2.0 + (i % 7) as f64 * 0.5;
                    (Seniority::Middle, exp, 1600.0 + (exp - 2.0) * 350.0 + job_offset)
                }
                _ => {
                    let exp = 4.0 + (i % 11) as f64 * 0.5;
                    (Seniority::Senior, exp, 3000.0 + (exp - 4.0) * 400.0 + job_offset)
                }
            };
            CandidateRow::new(JOBS[i % 4], level, ENGLISH[i % 5], experience, salary)
        })
        .collect()
}

fn config(models: &[&str]) -> PipelineConfig {
    PipelineConfig::default().with_models(models.iter().map(|m| m.to_string()).collect())
}

#[test]
fn test_split_respects_train_size() {
    let df = rows_to_frame(&survey_rows(101)).unwrap();
    let bundle = train_test_split(&df, "salary_usd", 0.8, 25).unwrap();
    assert_eq!(bundle.x_train.height(), 80);
    assert_eq!(bundle.x_test.height(), 21);
    assert_eq!(bundle.y_train.len(), 80);
    assert!(bundle.x_train.column("salary_usd").is_err());
}

#[test]
fn test_orchestrator_selects_and_persists_best() {
    let df = rows_to_frame(&survey_rows(120)).unwrap();
    let bundle = train_test_split(&df, "salary_usd", 0.8, 25).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let orchestrator =
        TrainingOrchestrator::from_config(&config(&["LinearRegression", "Ridge", "DecisionTree"]))
            .unwrap();
    let report = orchestrator.train(&bundle, Some(dir.path())).unwrap();

    assert_eq!(report.results.len(), 3);
    assert!(report.failures.is_empty());
    assert_eq!(
        report.results.iter().map(|r| r.family).collect::<Vec<_>>(),
        vec![ModelFamily::LinearRegression, ModelFamily::Ridge, ModelFamily::DecisionTree]
    );

    // highest rounded test R², earliest family on ties
    let best = report.best();
    let best_score = round_to(best.test.r2, 2);
    for (idx, result) in report.results.iter().enumerate() {
        let score = round_to(result.test.r2, 2);
        assert!(score <= best_score);
        if idx < report.best {
            assert!(score < best_score);
        }
    }
    assert!(best.test.r2 > 0.8);

    for file in [BEST_MODEL_FILE, PREPROCESSOR_FILE, METADATA_FILE] {
        assert!(dir.path().join(file).exists(), "{} missing", file);
    }
    let artifacts = ModelArtifacts::load(dir.path()).unwrap();
    assert_eq!(artifacts.metadata.model_name, best.family.name());
    assert!((artifacts.metadata.test_r2 - best.test.r2).abs() < 1e-12);
    assert_eq!(artifacts.metadata.params, best.params);

    let restored = artifacts.pipeline.predict(&bundle.x_test).unwrap();
    let original = best.pipeline.predict(&bundle.x_test).unwrap();
    for (a, b) in restored.iter().zip(original.iter()) {
        assert!((a - b).abs() < 1e-6);
    }

    assert!(report.summary().contains("Best model"));
}

#[test]
fn test_no_successful_model_persists_nothing() {
    // four training rows cannot feed a five-fold search
    let df = rows_to_frame(&survey_rows(6)).unwrap();
    let bundle = train_test_split(&df, "salary_usd", 0.8, 25).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let orchestrator =
        TrainingOrchestrator::from_config(&config(&["LinearRegression", "Lasso"])).unwrap();
    let err = orchestrator.train(&bundle, Some(dir.path())).unwrap_err();

    assert!(matches!(err, SalaryError::TrainingError(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_training_is_reproducible() {
    let df = rows_to_frame(&survey_rows(90)).unwrap();
    let bundle = train_test_split(&df, "salary_usd", 0.8, 25).unwrap();
    let orchestrator = TrainingOrchestrator::from_config(&config(&["RandomForest"])).unwrap();

    let a = orchestrator.train(&bundle, None).unwrap();
    let b = orchestrator.train(&bundle, None).unwrap();
    assert_eq!(a.best().params, b.best().params);
    assert_eq!(a.best().test, b.best().test);
}

#[test]
fn test_failed_family_is_skipped() {
    // two-row folds leave every KNN candidate short of neighbours
    let df = rows_to_frame(&survey_rows(5)).unwrap();
    let bundle = train_test_split(&df, "salary_usd", 0.8, 25).unwrap();
    assert_eq!(bundle.y_train.len(), 4);
    let dir = tempfile::tempdir().unwrap();

    let mut pipeline = config(&["DecisionTree", "KNN", "Ridge"]).with_cv_folds(2);
    pipeline.encoder_cv = 2;
    let report = TrainingOrchestrator::from_config(&pipeline)
        .unwrap()
        .train(&bundle, Some(dir.path()))
        .unwrap();

    assert_eq!(
        report.results.iter().map(|r| r.family).collect::<Vec<_>>(),
        vec![ModelFamily::Ridge, ModelFamily::DecisionTree]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, ModelFamily::KNN);
    assert!(report.failures[0].1.contains("every KNN candidate failed"));

    let artifacts = ModelArtifacts::load(dir.path()).unwrap();
    assert_eq!(artifacts.metadata.model_name, report.best().family.name());
    assert_ne!(artifacts.metadata.model_name, "KNN");
    assert!(report.summary().contains("KNN"));
}
