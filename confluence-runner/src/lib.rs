//! Confluence Runner — backtest orchestration on top of `confluence-core`.
//!
//! - TOML run configuration with content-hash run ids
//! - CSV loading of the combined price + indicator table
//! - Single runs and parallel batches
//! - JSON / CSV / Markdown artifacts
//! - Seeded synthetic tables for development

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod synthetic;

pub use batch::{cross_product, run_batch, BatchEntry, BatchJob};
pub use config::{BacktestConfig, BacktestSection, ConfigError, RunId};
pub use data_loader::{load_csv, parse_csv, LoadError, LoadOptions, LoadedTable};
pub use export::{
    export_batch_json, export_equity_csv, export_json, export_trades_csv, generate_report,
    import_json, load_artifacts, save_artifacts,
};
pub use runner::{run_backtest, run_from_file, BacktestResult, RunError, SCHEMA_VERSION};
pub use synthetic::SyntheticConfig;
