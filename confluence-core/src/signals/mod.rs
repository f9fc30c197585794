//! Signal integration — fuses independent indicator scores into one
//! confidence-scored decision per day.
//!
//! The integrator never sees portfolio state. It reads a `ScoreTable` and
//! nothing else, so the same table always yields the same signal stream.

pub mod config;
pub mod indicator;
pub mod integrator;

pub use config::{default_indicators, default_weights, IntegratorConfig, WEIGHT_SUM_TOLERANCE};
pub use indicator::{classify, IndicatorSpec};
pub use integrator::{
    aggregate_strength, confidence, quality, IntegrationSummary, SignalIntegrator, MAX_CONFIDENCE,
    STRENGTH_THRESHOLD,
};
