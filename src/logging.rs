//! Logging initialisation
//!
//! Console output plus a plain-text `pipeline.log` under the logs directory.

use crate::config::PathsConfig;
use crate::error::Result;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "salary_estimator=info,salary=info";

/// Install the global subscriber. Call once, from the binary.
pub fn init(paths: &PathsConfig, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(&paths.logs_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.pipeline_log_path())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("salary_estimator=debug,salary=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();

    Ok(())
}
