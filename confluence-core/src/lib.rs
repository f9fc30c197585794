//! Confluence Core — domain types, signal integration, risk management,
//! the day-by-day backtest loop, and performance metrics.
//!
//! This crate is pure computation with no I/O:
//! - Domain types (bars, indicator scores, signals, positions, trades, snapshots)
//! - `SignalIntegrator`: N indicator scores → one confidence-scored decision per day
//! - `RiskManager`: sizing, stop-loss / take-profit / trailing-stop lifecycle
//! - `BacktestEngine`: sequential replay producing a trade ledger and equity history
//! - Performance metrics as pure functions

pub mod domain;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod risk;
pub mod signals;

pub use error::ConfigError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: all core types are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::DailyBar>();
        require_sync::<domain::DailyBar>();
        require_send::<domain::IndicatorScore>();
        require_sync::<domain::IndicatorScore>();
        require_send::<domain::ScoreTable>();
        require_sync::<domain::ScoreTable>();
        require_send::<domain::IntegratedSignal>();
        require_sync::<domain::IntegratedSignal>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::RoundTrip>();
        require_sync::<domain::RoundTrip>();
        require_send::<domain::PortfolioSnapshot>();
        require_sync::<domain::PortfolioSnapshot>();

        // Components
        require_send::<signals::SignalIntegrator>();
        require_sync::<signals::SignalIntegrator>();
        require_send::<risk::RiskManager>();
        require_sync::<risk::RiskManager>();
        require_send::<engine::BacktestEngine>();
        require_sync::<engine::BacktestEngine>();

        // Results
        require_send::<engine::BacktestOutcome>();
        require_sync::<engine::BacktestOutcome>();
        require_send::<engine::DayError>();
        require_sync::<engine::DayError>();
        require_send::<metrics::PerformanceMetrics>();
        require_sync::<metrics::PerformanceMetrics>();
        require_send::<ConfigError>();
        require_sync::<ConfigError>();
    }

    /// Architecture contract: the integrator never sees portfolio state.
    ///
    /// `integrate_row` takes a `ScoreRow` and nothing else. If a portfolio
    /// parameter is ever added this stops compiling.
    #[test]
    fn integrator_has_no_portfolio_parameter() {
        fn _check(
            integrator: &signals::SignalIntegrator,
            row: &domain::ScoreRow,
        ) -> domain::IntegratedSignal {
            integrator.integrate_row(row)
        }
    }
}
