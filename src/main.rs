//! Salary estimator - Main Entry Point

use clap::Parser;
use salary_estimator::cli::{cmd_predict, cmd_rules, cmd_run, cmd_score, resolve_config, Cli, Commands};
use salary_estimator::inference::PredictionRequest;
use salary_estimator::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    logging::init(&config.paths, cli.verbose)?;

    match &cli.command {
        Commands::Run { data, models, dry_run } => cmd_run(&config, data, models, *dry_run)?,
        Commands::Predict {
            job,
            seniority,
            english,
            experience,
        } => {
            let request = PredictionRequest {
                job_category: job.clone(),
                seniority_level: seniority.clone(),
                english_level: english.clone(),
                experience_years: *experience,
            };
            cmd_predict(&config, &request)?;
        }
        Commands::Score {
            seniority,
            experience,
            salary,
        } => cmd_score(&config, seniority, *experience, *salary)?,
        Commands::Rules => cmd_rules(&config)?,
    }

    Ok(())
}
