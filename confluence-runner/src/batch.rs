//! Batch mode: many (config, data file) jobs in parallel.
//!
//! Every job owns its integrator, engine and risk manager, so jobs share
//! nothing. Results come back in job order; a failed job yields an
//! `{ "error": reason }` entry rather than aborting the batch.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BacktestConfig;
use crate::runner::{run_from_file, BacktestResult};

#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub config: BacktestConfig,
    pub data: PathBuf,
}

impl BatchJob {
    pub fn new(config: BacktestConfig, data: impl Into<PathBuf>) -> Self {
        Self {
            config,
            data: data.into(),
        }
    }
}

/// Outcome of one batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Failed { error: String },
    Done(Box<BacktestResult>),
}

impl BatchEntry {
    pub fn result(&self) -> Option<&BacktestResult> {
        match self {
            BatchEntry::Done(result) => Some(result),
            BatchEntry::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BatchEntry::Failed { error } => Some(error),
            BatchEntry::Done(_) => None,
        }
    }
}

/// Every config against every data file, configs outermost.
///
/// A config still carrying the default symbol takes the data file's stem.
pub fn cross_product(configs: &[BacktestConfig], data: &[PathBuf]) -> Vec<BatchJob> {
    let default_symbol = BacktestConfig::default().backtest.symbol;
    configs
        .iter()
        .flat_map(|config| {
            let default_symbol = default_symbol.clone();
            data.iter().map(move |path| {
                let mut config = config.clone();
                if config.backtest.symbol == default_symbol {
                    if let Some(stem) = file_stem(path) {
                        config.backtest.symbol = stem;
                    }
                }
                BatchJob::new(config, path.clone())
            })
        })
        .collect()
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Run all jobs on the rayon pool. Output order matches `jobs`.
pub fn run_batch(jobs: &[BatchJob]) -> Vec<BatchEntry> {
    info!(jobs = jobs.len(), "starting batch");
    let entries: Vec<BatchEntry> = jobs
        .par_iter()
        .map(|job| match run_from_file(&job.config, &job.data) {
            Ok(result) => BatchEntry::Done(Box::new(result)),
            Err(e) => {
                warn!(data = %job.data.display(), error = %e, "batch job failed");
                BatchEntry::Failed {
                    error: e.to_string(),
                }
            }
        })
        .collect();
    let failed = entries.iter().filter(|e| e.error().is_some()).count();
    info!(jobs = jobs.len(), failed, "batch finished");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_product_orders_configs_outermost() {
        let mut a = BacktestConfig::default();
        a.signal.confidence_threshold = 0.6;
        let b = BacktestConfig::default().with_symbol("FIXED");
        let data = vec![PathBuf::from("data/AAA.csv"), PathBuf::from("data/BBB.csv")];

        let jobs = cross_product(&[a, b], &data);
        assert_eq!(jobs.len(), 4);
        let symbols: Vec<&str> = jobs.iter().map(|j| j.config.backtest.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB", "FIXED", "FIXED"]);
        assert_eq!(jobs[1].config.signal.confidence_threshold, 0.6);
        assert_eq!(jobs[3].data, PathBuf::from("data/BBB.csv"));
    }

    #[test]
    fn failed_entry_serializes_as_error_object() {
        let entry = BatchEntry::Failed {
            error: "boom".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "boom" }));
    }

    #[test]
    fn missing_file_fails_only_its_job() {
        let jobs = vec![BatchJob::new(
            BacktestConfig::default(),
            "definitely/not/here.csv",
        )];
        let entries = run_batch(&jobs);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].error().unwrap().contains("not/here.csv"));
    }
}
