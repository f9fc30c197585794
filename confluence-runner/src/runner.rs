//! Backtest runner: wires config, loaded table, integrator and engine.
//!
//! Two entry points:
//! - `run_from_file()`: loads the CSV then runs. Used by the CLI and batch mode.
//! - `run_backtest()`: takes a pre-loaded table. No I/O.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use confluence_core::engine::{check_prices, BacktestEngine, BacktestOutcome};
use confluence_core::signals::{IntegrationSummary, SignalIntegrator};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_csv, LoadError, LoadOptions, LoadedTable};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("no rows between {start} and {end} ({total} rows in input)")]
    EmptySelection {
        start: String,
        end: String,
        total: usize,
    },
}

impl From<confluence_core::ConfigError> for RunError {
    fn from(e: confluence_core::ConfigError) -> Self {
        RunError::Config(ConfigError::Invalid(e))
    }
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub dataset_hash: String,
    pub config: BacktestConfig,
    pub outcome: BacktestOutcome,
    pub signal_summary: IntegrationSummary,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn initial_capital(&self) -> f64 {
        self.config.backtest.initial_capital
    }
}

/// Load `data` with the config's date window, then run.
pub fn run_from_file(config: &BacktestConfig, data: &Path) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let opts = LoadOptions {
        start_date: config.backtest.start_date,
        end_date: config.backtest.end_date,
    };
    let table = load_csv(data, &config.signal, &opts)?;
    if table.is_empty() && table.total_rows > 0 {
        let fmt = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        return Err(RunError::EmptySelection {
            start: fmt(opts.start_date),
            end: fmt(opts.end_date),
            total: table.total_rows,
        });
    }
    run_backtest(config, &table)
}

/// Integrate the table's scores and replay its bars. No I/O.
pub fn run_backtest(config: &BacktestConfig, table: &LoadedTable) -> Result<BacktestResult, RunError> {
    let run_id = config.run_id()?;
    let integrator = SignalIntegrator::new(config.integrator_config())?;
    let mut engine = BacktestEngine::new(config.engine_config())?;

    check_prices(&table.bars)?;

    let signals = integrator.integrate(&table.scores);
    let signal_summary = integrator.summarize(&signals);
    let outcome = engine.run(&table.bars, &signals);

    if let Some(report) = outcome.report() {
        info!(
            symbol = %config.backtest.symbol,
            run_id = %&run_id[..12],
            trades = report.trades.len(),
            total_return = report.metrics.total_return,
            day_errors = report.day_errors.len(),
            "backtest complete"
        );
    } else {
        info!(symbol = %config.backtest.symbol, "no bars to simulate");
    }

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        symbol: config.backtest.symbol.clone(),
        dataset_hash: table.dataset_hash.clone(),
        config: config.clone(),
        outcome,
        signal_summary,
    })
}
