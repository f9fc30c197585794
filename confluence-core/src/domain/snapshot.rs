//! PortfolioSnapshot — end-of-day cash/shares/value record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio state at the close of one day.
///
/// Invariant: `total_value == cash + stock_value == cash + shares × mark_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub shares: u64,
    pub mark_price: f64,
    pub stock_value: f64,
    pub total_value: f64,
    pub period_return: f64,
    pub cumulative_return: f64,
}

impl PortfolioSnapshot {
    /// Starting snapshot: all cash, no returns.
    pub fn baseline(date: NaiveDate, initial_capital: f64) -> Self {
        Self {
            date,
            cash: initial_capital,
            shares: 0,
            mark_price: 0.0,
            stock_value: 0.0,
            total_value: initial_capital,
            period_return: 0.0,
            cumulative_return: 0.0,
        }
    }

    /// Mark `shares` at `mark_price` and chain returns onto `prev`.
    pub fn mark(
        date: NaiveDate,
        cash: f64,
        shares: u64,
        mark_price: f64,
        prev: &PortfolioSnapshot,
    ) -> Self {
        let stock_value = shares as f64 * mark_price;
        let total_value = cash + stock_value;
        let period_return = if prev.total_value > 0.0 {
            (total_value - prev.total_value) / prev.total_value
        } else {
            0.0
        };
        let cumulative_return = (1.0 + prev.cumulative_return) * (1.0 + period_return) - 1.0;
        Self {
            date,
            cash,
            shares,
            mark_price,
            stock_value,
            total_value,
            period_return,
            cumulative_return,
        }
    }

    /// Same holdings as `prev`, re-dated, zero period return.
    pub fn carried_forward(date: NaiveDate, prev: &PortfolioSnapshot) -> Self {
        Self {
            date,
            period_return: 0.0,
            ..prev.clone()
        }
    }

    /// Check the accounting identity within `tolerance`.
    pub fn is_balanced(&self, tolerance: f64) -> bool {
        let expected = self.cash + self.shares as f64 * self.mark_price;
        (self.total_value - expected).abs() <= tolerance
            && (self.stock_value - self.shares as f64 * self.mark_price).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn returns_compound() {
        let base = PortfolioSnapshot::baseline(d(1), 1000.0);
        let s1 = PortfolioSnapshot::mark(d(2), 0.0, 10, 110.0, &base);
        assert!((s1.period_return - 0.10).abs() < 1e-12);
        let s2 = PortfolioSnapshot::mark(d(3), 0.0, 10, 121.0, &s1);
        assert!((s2.period_return - 0.10).abs() < 1e-12);
        assert!((s2.cumulative_return - 0.21).abs() < 1e-12);
        assert!(s2.is_balanced(1e-9));
    }

    #[test]
    fn carried_forward_keeps_holdings() {
        let base = PortfolioSnapshot::baseline(d(1), 1000.0);
        let s1 = PortfolioSnapshot::mark(d(2), 500.0, 5, 110.0, &base);
        let cf = PortfolioSnapshot::carried_forward(d(3), &s1);
        assert_eq!(cf.date, d(3));
        assert_eq!(cf.total_value, s1.total_value);
        assert_eq!(cf.cumulative_return, s1.cumulative_return);
        assert_eq!(cf.period_return, 0.0);
    }
}
