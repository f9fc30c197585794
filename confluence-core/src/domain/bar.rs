//! DailyBar — one end-of-day record of the input table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV record for a single symbol on a single day.
///
/// `volatility` is an optional precomputed figure (e.g. annualized standard
/// deviation as a fraction) that feeds position sizing and stop widening.
/// Missing prices are carried as NaN rather than rejected at ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub volatility: Option<f64>,
}

impl DailyBar {
    /// Bar with every price equal to `close`. Handy for close-only series.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            volatility: None,
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    /// True when the close is unusable for marking or filling.
    pub fn is_void(&self) -> bool {
        !self.close.is_finite() || self.close <= 0.0
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() || self.open.is_nan() || self.high.is_nan() || self.low.is_nan() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
    }

    /// Volatility if the feed supplied a usable one.
    pub fn usable_volatility(&self) -> Option<f64> {
        self.volatility.filter(|v| v.is_finite() && *v >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 70_000.0,
            high: 71_500.0,
            low: 69_200.0,
            close: 71_000.0,
            volume: 12_000_000.0,
            volatility: None,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
        assert!(!sample_bar().is_void());
    }

    #[test]
    fn nan_close_is_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn non_positive_close_is_void() {
        let mut bar = sample_bar();
        bar.close = 0.0;
        assert!(bar.is_void());
    }

    #[test]
    fn detects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 69_000.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn negative_volatility_is_ignored() {
        let bar = sample_bar().with_volatility(-0.1);
        assert_eq!(bar.usable_volatility(), None);
        let bar = sample_bar().with_volatility(0.25);
        assert_eq!(bar.usable_volatility(), Some(0.25));
    }
}
