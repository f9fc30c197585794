//! Backtesting engine — sequential day loop and supporting pieces.
//!
//! The engine consumes ascending `DailyBar`s and the integrated signal stream
//! for one symbol, then for each day:
//!
//! 1. Validate the day (date order, usable close)
//! 2. Check risk-driven forced exits on an open position
//! 3. Act on the day's Buy/Sell signal
//! 4. Mark-to-market and append a `PortfolioSnapshot`
//!
//! Failed days become `DayError`s and a carried-forward snapshot.

pub mod config;
pub mod cost_model;
pub mod loop_runner;
pub mod state;
pub mod trade_extraction;

pub use config::EngineConfig;
pub use cost_model::CostModel;
pub use loop_runner::{BacktestEngine, BacktestOutcome, BacktestReport};
pub use state::{check_prices, DayError, LedgerState};
pub use trade_extraction::extract_round_trips;
