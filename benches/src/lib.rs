//! Benchmark tooling for katkit.
//!
//! Two things live here:
//!
//! - **Result aggregation**: [`compute_all`] groups raw timing samples from
//!   load runs by concurrency level and reports the mean and sample standard
//!   deviation per level. The `bench-results` binary wraps it:
//!
//!   ```bash
//!   cargo run --package katkit-benches --bin bench-results -- \
//!       --input runs.json --output out.json
//!   ```
//!
//! - **Micro-benchmarks** (`benches/message.rs`): canonical message
//!   formatting, message recording and sequence assertions.
//!
//!   ```bash
//!   cargo bench --package katkit-benches --bench message
//!   ```
//!
//! Criterion writes reports to `target/criterion/`.
//!
//! # Input and output
//!
//! The input is a list of runs, each sample a `[measurement, concurrency]`
//! pair:
//!
//! ```json
//! [{"scenario": "scenario1", "interpreter": "cpython 2.6.5", "lib": "katcp",
//!   "samples": [[2875, 1], [2741, 1], [1077, 2]]}]
//! ```
//!
//! The output maps each scenario to one summary per run. Index `i` of
//! `result` and `errors` describes concurrency level `i + 1`; levels with no
//! samples, and deviations of single-sample levels, are `null`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// One timing sample: the measurement and the concurrency it was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample(pub f64, pub u32);

/// The raw samples of one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// The load scenario.
    pub scenario: String,
    /// The runtime the run used.
    pub interpreter: String,
    /// The library under test.
    pub lib: String,
    /// Samples in recording order.
    pub samples: Vec<Sample>,
}

/// Per-level statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Mean per concurrency level, starting at level 1.
    pub result: Vec<Option<f64>>,
    /// Sample standard deviation per concurrency level.
    pub errors: Vec<Option<f64>>,
    /// The library under test.
    pub lib: String,
    /// The runtime the run used.
    pub interpreter: String,
}

/// Summaries keyed by scenario, in input order within each scenario.
pub type Report = BTreeMap<String, Vec<RunSummary>>;

/// Aggregation failures.
#[derive(Error, miette::Diagnostic, Debug)]
pub enum AggregateError {
    /// Concurrency levels start at 1.
    #[error("Run '{lib}' of scenario '{scenario}' has a sample at concurrency level 0")]
    #[diagnostic(code(katkit::bench::zero_concurrency))]
    ZeroConcurrency {
        /// The scenario of the offending run.
        scenario: String,
        /// The library of the offending run.
        lib: String,
    },

    /// A results file could not be read or written.
    #[error("Could not access '{}'", .path.display())]
    #[diagnostic(code(katkit::bench::io))]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A results file is not valid JSON of the expected shape.
    #[error("Invalid results JSON: {0}")]
    #[diagnostic(code(katkit::bench::json))]
    Json(#[from] serde_json::Error),
}

/// Mean and sample standard deviation per concurrency level of one run.
///
/// A level with a single sample has no defined deviation; it is reported as
/// `None` with a warning.
pub fn summarize(run: &BenchmarkRun) -> Result<RunSummary, AggregateError> {
    let mut levels: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for &Sample(measurement, concurrency) in &run.samples {
        if concurrency == 0 {
            return Err(AggregateError::ZeroConcurrency {
                scenario: run.scenario.clone(),
                lib: run.lib.clone(),
            });
        }
        levels.entry(concurrency).or_default().push(measurement);
    }

    let max_level = levels.keys().next_back().copied().unwrap_or(0) as usize;
    let mut result = vec![None; max_level];
    let mut errors = vec![None; max_level];

    for (level, values) in &levels {
        let index = *level as usize - 1;
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        result[index] = Some(mean);

        if values.len() < 2 {
            warn!(
                scenario = %run.scenario,
                lib = %run.lib,
                concurrency = *level,
                "single sample, standard deviation undefined"
            );
            continue;
        }
        let squares: f64 = values.iter().map(|v| (mean - v) * (mean - v)).sum();
        errors[index] = Some((squares / (n - 1.0)).sqrt());
    }

    Ok(RunSummary {
        result,
        errors,
        lib: run.lib.clone(),
        interpreter: run.interpreter.clone(),
    })
}

/// Summarize every run, grouping the summaries by scenario.
pub fn compute_all(runs: &[BenchmarkRun]) -> Result<Report, AggregateError> {
    let mut report = Report::new();
    for run in runs {
        report
            .entry(run.scenario.clone())
            .or_default()
            .push(summarize(run)?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use katkit_testing::LogCapture;
    use pretty_assertions::assert_eq;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn run(scenario: &str, lib: &str, samples: &[(f64, u32)]) -> BenchmarkRun {
        BenchmarkRun {
            scenario: scenario.to_string(),
            interpreter: "cpython 2.6.5".to_string(),
            lib: lib.to_string(),
            samples: samples.iter().map(|&(v, c)| Sample(v, c)).collect(),
        }
    }

    #[test]
    fn test_means_and_deviations() {
        let capture = LogCapture::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        let summary = tracing::subscriber::with_default(subscriber, || {
            summarize(&run("s", "katcp", &[(10.0, 1), (20.0, 1), (30.0, 2)])).unwrap()
        });

        assert_eq!(summary.result, [Some(15.0), Some(30.0)]);
        let deviation = summary.errors[0].unwrap();
        assert!((deviation - 7.0711).abs() < 1e-4);
        assert_eq!(summary.errors[1], None);
        assert!(capture.contains(Level::WARN, "standard deviation undefined"));
    }

    #[test]
    fn test_missing_levels_are_null() {
        let summary = summarize(&run("s", "katcp", &[(4.0, 3), (6.0, 3)])).unwrap();
        assert_eq!(summary.result, [None, None, Some(5.0)]);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["result"], serde_json::json!([null, null, 5.0]));
        assert_eq!(json["errors"][0], serde_json::Value::Null);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = summarize(&run("s", "katcp", &[(1.0, 0)])).unwrap_err();
        assert!(matches!(err, AggregateError::ZeroConcurrency { .. }));
    }

    #[test]
    fn test_grouped_by_scenario_in_input_order() {
        let runs = [
            run("scenario1", "katcp", &[(1.0, 1), (3.0, 1)]),
            run("scenario2", "katcp", &[(5.0, 1), (7.0, 1)]),
            run("scenario1", "txkatcp", &[(2.0, 1), (4.0, 1)]),
        ];
        let report = compute_all(&runs).unwrap();

        let libs: Vec<&str> = report["scenario1"].iter().map(|s| s.lib.as_str()).collect();
        assert_eq!(libs, ["katcp", "txkatcp"]);
        assert_eq!(report["scenario2"][0].result, [Some(6.0)]);
    }

    #[test]
    fn test_samples_read_as_pairs() {
        let runs: Vec<BenchmarkRun> = serde_json::from_str(
            r#"[{"scenario": "s", "interpreter": "pypy", "lib": "katcp",
                 "samples": [[2875, 1], [650.5, 2]]}]"#,
        )
        .unwrap();
        assert_eq!(runs[0].samples, [Sample(2875.0, 1), Sample(650.5, 2)]);
    }

    #[test]
    fn test_empty_run() {
        let summary = summarize(&run("s", "katcp", &[])).unwrap();
        assert!(summary.result.is_empty());
        assert!(summary.errors.is_empty());
    }
}
