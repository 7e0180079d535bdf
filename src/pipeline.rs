//! End-to-end training run
//!
//! load -> standardize seniority -> drop unspecified -> balance ->
//! experience pass -> salary pass -> export -> split -> train -> snapshots

use crate::config::AppConfig;
use crate::data::{
    drop_unspecified, frame_to_rows, rows_to_frame, CandidateRow, DataLoader, DataSaver,
};
use crate::error::Result;
use crate::export::{AllowedValuesConfig, FeatureTypesConfig};
use crate::preprocessing::{CategoryBalancer, ExperienceScorer, PassSummary, SalaryScorer};
use crate::rules::{load_experience_rules, load_salary_rules};
use crate::training::{train_test_split, TrainingOrchestrator, TrainingReport};
use polars::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// What a run reads and which outputs it writes
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    /// Write the cleaned frame to `data/processed/model_input.csv`
    pub save_data: bool,
    /// Persist the winning model under the models directory
    pub save_model: bool,
    /// Write the allowed-values and feature-type snapshots
    pub save_configs: bool,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            save_data: true,
            save_model: true,
            save_configs: true,
        }
    }

    pub fn dry(mut self) -> Self {
        self.save_data = false;
        self.save_model = false;
        self.save_configs = false;
        self
    }
}

/// Row counts of each cleaning stage and the training outcome
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows_loaded: usize,
    pub rows_specified: usize,
    pub rows_balanced: usize,
    pub experience: PassSummary,
    pub salary: PassSummary,
    pub report: TrainingReport,
    pub elapsed_secs: f64,
}

/// Survivors of the cleaning stages with per-stage counts
#[derive(Debug, Clone)]
pub struct CleanedRows {
    pub rows: Vec<CandidateRow>,
    pub specified: usize,
    pub balanced: usize,
    pub experience: PassSummary,
    pub salary: PassSummary,
}

/// Cleaning stages on typed rows: drop unspecified seniority, balance, then
/// the experience pass followed by the salary pass
pub fn clean_rows(config: &AppConfig, rows: Vec<CandidateRow>) -> Result<CleanedRows> {
    let pipeline = &config.pipeline;
    let experience =
        ExperienceScorer::new(load_experience_rules(pipeline.experience_rules.as_deref())?);
    let salary = SalaryScorer::new(load_salary_rules(pipeline.salary_rules.as_deref())?);

    let before = rows.len();
    let rows = drop_unspecified(rows);
    info!(dropped = before - rows.len(), "Dropped rows with unspecified seniority");
    let specified = rows.len();

    let rows = CategoryBalancer::from_targets(&pipeline.balance_targets)
        .with_seed(pipeline.balance_seed)
        .balance(rows);
    let balanced = rows.len();

    let (rows, experience_pass) = experience.clean(rows);
    let (rows, salary_pass) = salary.clean(rows);
    Ok(CleanedRows {
        rows,
        specified,
        balanced,
        experience: experience_pass,
        salary: salary_pass,
    })
}

/// Run the whole pipeline
pub fn run(config: &AppConfig, options: &RunOptions) -> Result<RunSummary> {
    let start = Instant::now();
    config.pipeline.validate()?;
    config.paths.ensure_dirs()?;

    let raw = DataLoader::new().load_csv(&options.input)?;
    let rows_loaded = raw.height();
    let rows = frame_to_rows(&raw)?;

    let mut cleaned_rows = clean_rows(config, rows)?;
    cleaned_rows
        .rows
        .sort_by(|a, b| a.salary_usd.total_cmp(&b.salary_usd));
    let mut cleaned = rows_to_frame(&cleaned_rows.rows)?;
    info!(rows = cleaned.height(), "Cleaning complete");

    if options.save_data {
        DataSaver::save_csv(&mut cleaned, &config.paths.processed_data_path())?;
    }

    let bundle = train_test_split(
        &cleaned,
        &config.pipeline.target_column,
        config.pipeline.train_size,
        config.pipeline.split_seed,
    )?;

    let orchestrator = TrainingOrchestrator::from_config(&config.pipeline)?;
    let save_dir = options.save_model.then_some(config.paths.models_dir.as_path());
    let report = orchestrator.train(&bundle, save_dir)?;

    if options.save_configs {
        save_snapshots(config, &cleaned)?;
    }

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        model = %report.best().family,
        test_r2 = report.best().test.r2,
        secs = elapsed_secs,
        "Pipeline finished"
    );
    Ok(RunSummary {
        rows_loaded,
        rows_specified: cleaned_rows.specified,
        rows_balanced: cleaned_rows.balanced,
        experience: cleaned_rows.experience,
        salary: cleaned_rows.salary,
        report,
        elapsed_secs,
    })
}

fn save_snapshots(config: &AppConfig, cleaned: &DataFrame) -> Result<()> {
    let allowed = AllowedValuesConfig::from_frame(cleaned)?;
    allowed.save(&config.paths.allowed_values_path())?;

    let types = FeatureTypesConfig::from_frame(cleaned, &config.pipeline.target_column);
    types.save(&config.paths.feature_types_path())?;
    info!(
        columns = types.columns.len(),
        dir = %config.paths.configs_dir.display(),
        "Saved configuration snapshots"
    );
    Ok(())
}
