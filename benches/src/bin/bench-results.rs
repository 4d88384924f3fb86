//! Aggregate raw benchmark samples into per-concurrency statistics.

use clap::Parser;
use katkit_benches::{AggregateError, BenchmarkRun, compute_all};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bench-results")]
#[command(about = "Summarize benchmark runs by concurrency level", long_about = None)]
struct Cli {
    /// JSON file with the raw runs
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the summary JSON
    #[arg(short, long, default_value = "out.json")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let raw = fs::read_to_string(&cli.input).map_err(|source| AggregateError::Io {
        path: cli.input.clone(),
        source,
    })?;
    let runs: Vec<BenchmarkRun> = serde_json::from_str(&raw).map_err(AggregateError::from)?;
    let report = compute_all(&runs)?;

    let json = serde_json::to_string(&report).map_err(AggregateError::from)?;
    fs::write(&cli.output, json).map_err(|source| AggregateError::Io {
        path: cli.output.clone(),
        source,
    })?;

    info!(
        runs = runs.len(),
        scenarios = report.len(),
        output = %cli.output.display(),
        "wrote benchmark summary"
    );
    Ok(())
}
