//! Salary estimator CLI module
//!
//! Command-line interface for the training pipeline, guarded prediction and
//! rule inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AppConfig;
use crate::data::Seniority;
use crate::inference::{PredictionRequest, SalaryPredictor};
use crate::pipeline::{self, RunOptions};
use crate::preprocessing::{ExperienceScorer, SalaryScorer, ScoredValue};
use crate::rules::{load_experience_rules, load_salary_rules, ValueRange};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(235, 110, 100) }

fn kv(key: &str, val: &str) -> String {
    format!("{:<18} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn range(r: &ValueRange) -> String {
    format!("{:>7} – {:<7}", r.lo, r.hi)
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "salary")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "IT salary estimator: data cleaning, model selection and guarded inference")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root holding data/, models/, configs/ and logs/
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean the dataset, train every model family and persist the best
    Run {
        /// Input CSV with the renamed survey columns
        #[arg(short, long)]
        data: PathBuf,

        /// Restrict training to these model families
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,

        /// Do not write the processed dataset, model or snapshots
        #[arg(long)]
        dry_run: bool,
    },

    /// Predict one salary with the persisted model
    Predict {
        #[arg(long)]
        job: String,

        #[arg(long)]
        seniority: String,

        #[arg(long)]
        english: String,

        #[arg(long)]
        experience: f64,
    },

    /// Show the outlier verdict for a seniority / experience / salary triple
    Score {
        #[arg(long)]
        seniority: String,

        #[arg(long)]
        experience: f64,

        #[arg(long)]
        salary: f64,
    },

    /// Validate and print the rule tables
    Rules,
}

/// Resolve the configuration from the global flags
pub fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(root) = &cli.root {
        config.paths = crate::config::PathsConfig::from_root(root);
    }
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    config: &AppConfig,
    data: &Path,
    models: &[String],
    dry_run: bool,
) -> anyhow::Result<()> {
    section("Run");

    let mut config = config.clone();
    if !models.is_empty() {
        config.pipeline = config.pipeline.with_models(models.to_vec());
    }
    let mut options = RunOptions::new(data);
    if dry_run {
        options = options.dry();
    }

    step_run("Cleaning and training");
    let start = Instant::now();
    let summary = pipeline::run(&config, &options)?;
    step_done(&format!("{:.1}s", start.elapsed().as_secs_f64()));

    println!();
    println!("  {}", kv("Rows loaded", &summary.rows_loaded.to_string()));
    println!("  {}", kv("Seniority known", &summary.rows_specified.to_string()));
    println!("  {}", kv("After balancing", &summary.rows_balanced.to_string()));
    println!(
        "  {}",
        kv(
            "Experience pass",
            &format!("{} kept, {} dropped", summary.experience.kept, summary.experience.dropped)
        )
    );
    println!(
        "  {}",
        kv(
            "Salary pass",
            &format!("{} kept, {} dropped", summary.salary.kept, summary.salary.dropped)
        )
    );

    section("Models");
    for line in summary.report.summary().lines() {
        println!("  {}", line);
    }

    let best = summary.report.best();
    println!();
    println!(
        "  {} {} {}",
        ok("✓"),
        best.family.to_string().white().bold(),
        dim(&format!("test R² {:.2}", best.test.r2))
    );
    println!();
    Ok(())
}

pub fn cmd_predict(config: &AppConfig, request: &PredictionRequest) -> anyhow::Result<()> {
    section("Predict");
    let predictor = SalaryPredictor::load(&config.paths)?;
    let salary = predictor.predict_one(request)?;

    println!("  {}", kv("Model", &predictor.metadata().model_name));
    println!("  {}", kv("Salary (USD)", &salary.to_string()));
    println!();
    Ok(())
}

fn verdict(scored: &ScoredValue) -> ColoredString {
    let text = format!("{:.2} {:?}", scored.score.value(), scored.reason);
    if scored.score.is_dropped() {
        bad(&text)
    } else {
        ok(&text)
    }
}

pub fn cmd_score(
    config: &AppConfig,
    seniority: &str,
    experience: f64,
    salary: f64,
) -> anyhow::Result<()> {
    section("Score");
    let level = Seniority::from_title(seniority)?;
    let pipeline = &config.pipeline;
    let exp_scorer =
        ExperienceScorer::new(load_experience_rules(pipeline.experience_rules.as_deref())?);
    let sal_scorer = SalaryScorer::new(load_salary_rules(pipeline.salary_rules.as_deref())?);

    let exp = exp_scorer.score(level, experience);
    let sal = sal_scorer.score(level, salary);

    println!("  {}", kv("Seniority", level.as_str()));
    println!("  {} {}", kv("Experience", &experience.to_string()), verdict(&exp));
    println!("  {} {}", kv("Salary", &salary.to_string()), verdict(&sal));
    println!();
    if exp.score.is_dropped() || sal.score.is_dropped() {
        println!("  {} {}", bad("✗"), "row would be dropped".white());
    } else {
        println!("  {} {}", ok("✓"), "row would be kept".white());
    }
    println!();
    Ok(())
}

pub fn cmd_rules(config: &AppConfig) -> anyhow::Result<()> {
    let pipeline = &config.pipeline;
    let experience = load_experience_rules(pipeline.experience_rules.as_deref())?;
    let salary = load_salary_rules(pipeline.salary_rules.as_deref())?;
    experience.validate()?;
    salary.validate()?;

    section("Experience (years)");
    println!(
        "  {}",
        dim("level          typical            acceptable         thr   crit  max")
    );
    for (level, rule) in experience.iter() {
        let max = rule
            .max_outlier
            .map_or_else(|| "-".to_string(), |m| m.to_string());
        println!(
            "  {:<14} {} {} {:>5} {:>5} {:>4}",
            level.as_str(),
            range(&rule.typical_range),
            range(&rule.acceptable_range),
            rule.outlier_threshold,
            rule.critical_outlier,
            max
        );
    }

    section("Salary (USD / month)");
    println!(
        "  {}",
        dim("level          typical            acceptable         outlier            critical")
    );
    for (level, rule) in salary.iter() {
        println!(
            "  {:<14} {} {} {} {}",
            level.as_str(),
            range(&rule.typical_range),
            range(&rule.acceptable_range),
            range(&rule.outlier_range),
            range(&rule.critical_range)
        );
    }
    println!();
    println!("  {} {}", ok("✓"), "rule tables are consistent".white());
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict_command() {
        let cli = Cli::try_parse_from([
            "salary",
            "predict",
            "--job",
            "Backend",
            "--seniority",
            "Senior",
            "--english",
            "Advanced",
            "--experience",
            "6",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { experience, .. } => assert_eq!(experience, 6.0),
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_parse_model_filter() {
        let cli = Cli::try_parse_from(["salary", "run", "-d", "x.csv", "-m", "Ridge,Huber"]).unwrap();
        match cli.command {
            Commands::Run { models, dry_run, .. } => {
                assert_eq!(models, vec!["Ridge", "Huber"]);
                assert!(!dry_run);
            }
            _ => panic!("expected run"),
        }
    }
}
