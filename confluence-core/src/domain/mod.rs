//! Domain types for Confluence.
//!
//! Inputs (`DailyBar`, `IndicatorScore`, `ScoreTable`) are immutable once
//! ingested. Derived records (`IntegratedSignal`, `Trade`, `PortfolioSnapshot`)
//! are created once per step and never mutated afterwards. `Position` is the
//! only mutable record and lives inside the risk manager's registry.

pub mod bar;
pub mod position;
pub mod score;
pub mod signal;
pub mod snapshot;
pub mod trade;

pub use bar::DailyBar;
pub use position::Position;
pub use score::{IndicatorScore, ScoreRow, ScoreTable};
pub use signal::{IntegratedSignal, SignalDirection, SignalQuality, Vote};
pub use snapshot::PortfolioSnapshot;
pub use trade::{ExitReason, RoundTrip, Trade, TradeSide};
