//! Configuration errors raised by core constructors before any simulation.

use chrono::NaiveDate;

/// Invalid integrator, risk or engine configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("weight for '{id}' must be finite and non-negative, got {value}")]
    InvalidWeight { id: String, value: f64 },
    #[error("weight key '{0}' does not name a configured indicator")]
    UnknownWeightKey(String),
    #[error("weights must sum to 1.0 ± {tolerance}, got {sum:.4}")]
    WeightSum { sum: f64, tolerance: f64 },
    #[error("duplicate indicator id '{0}'")]
    DuplicateIndicator(String),
    #[error("indicator '{id}': {reason}")]
    InvalidIndicator { id: String, reason: String },
    #[error("at least one indicator must be configured")]
    NoIndicators,
    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },
    #[error("min_indicators must be >= 1")]
    MinIndicators,
    #[error("initial capital must be positive and finite, got {0}")]
    InitialCapital(f64),
    #[error("close on {date} must be positive, got {price}")]
    NonPositivePrice { date: NaiveDate, price: f64 },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &'static str, range: &'static str, value: f64) -> Self {
        ConfigError::OutOfRange { field, range, value }
    }
}

/// Check `value` lies strictly inside `(0, 1)`.
pub(crate) fn open_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(field, "(0, 1)", value))
    }
}

/// Check `value` lies in `[0, 1)`.
pub(crate) fn rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(field, "[0, 1)", value))
    }
}
