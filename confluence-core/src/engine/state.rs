//! Per-day failures and the mutable cash/shares ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DailyBar, PortfolioSnapshot};
use crate::error::ConfigError;
use crate::metrics::non_finite;

/// Why a day could not be processed. The day is carried forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayError {
    #[error("{date}: close price missing or non-positive")]
    MissingPrice { date: NaiveDate },
    #[error("{date}: not after previous day {previous}")]
    OutOfOrder { date: NaiveDate, previous: NaiveDate },
    #[error("{date}: non-finite close {value}")]
    NonFinite {
        date: NaiveDate,
        #[serde(with = "non_finite")]
        value: f64,
    },
}

impl DayError {
    pub fn date(&self) -> NaiveDate {
        match self {
            DayError::MissingPrice { date }
            | DayError::OutOfOrder { date, .. }
            | DayError::NonFinite { date, .. } => *date,
        }
    }
}

/// Reject a series holding a finite close at or below zero.
///
/// Missing and NaN closes are gaps, not errors; the loop turns them into
/// `DayError::MissingPrice`.
pub fn check_prices(bars: &[DailyBar]) -> Result<(), ConfigError> {
    match bars.iter().find(|b| b.close.is_finite() && b.close <= 0.0) {
        Some(bar) => Err(ConfigError::NonPositivePrice {
            date: bar.date,
            price: bar.close,
        }),
        None => Ok(()),
    }
}

/// Cash/shares ledger that evolves day by day.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub cash: f64,
    pub shares: u64,
    /// Last accepted date, for ordering checks.
    pub last_date: Option<NaiveDate>,
    pub last_snapshot: PortfolioSnapshot,
}

impl LedgerState {
    pub fn new(start: NaiveDate, initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            shares: 0,
            last_date: None,
            last_snapshot: PortfolioSnapshot::baseline(start, initial_capital),
        }
    }

    pub fn has_position(&self) -> bool {
        self.shares > 0
    }

    /// Check ordering and price. A well-ordered date is recorded even when the
    /// price is missing, so a repeated date is still caught.
    pub fn admit(&mut self, bar: &DailyBar) -> Result<(), DayError> {
        if let Some(previous) = self.last_date {
            if bar.date <= previous {
                return Err(DayError::OutOfOrder {
                    date: bar.date,
                    previous,
                });
            }
        }
        self.last_date = Some(bar.date);

        if bar.close.is_infinite() {
            return Err(DayError::NonFinite {
                date: bar.date,
                value: bar.close,
            });
        }
        if bar.is_void() {
            return Err(DayError::MissingPrice { date: bar.date });
        }
        Ok(())
    }
}
