use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Open long position with its protective levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub shares: u64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub trailing_stop_price: f64,
    pub highest_price_since_entry: f64,
    pub entry_confidence: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Position {
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.shares as f64 * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.shares as f64 * (current_price - self.entry_price)
    }

    /// Return relative to the entry price.
    pub fn current_return(&self, current_price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        (current_price - self.entry_price) / self.entry_price
    }

    /// Calendar days since entry.
    pub fn holding_days(&self, current_date: NaiveDate) -> i64 {
        (current_date - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Position {
        Position {
            symbol: "005930".into(),
            entry_price: 100.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            shares: 10,
            stop_loss_price: 90.0,
            take_profit_price: 120.0,
            trailing_stop_price: 95.0,
            highest_price_since_entry: 100.0,
            entry_confidence: 0.7,
            stop_loss_pct: 0.10,
            take_profit_pct: 0.20,
        }
    }

    #[test]
    fn pnl_and_return() {
        let p = position();
        assert_eq!(p.market_value(110.0), 1100.0);
        assert_eq!(p.unrealized_pnl(110.0), 100.0);
        assert!((p.current_return(95.0) + 0.05).abs() < 1e-12);
    }

    #[test]
    fn holding_days_are_calendar_days() {
        let p = position();
        let later = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(p.holding_days(later), 90);
    }
}
