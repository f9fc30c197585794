//! Trade ledger entries and completed round trips.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    TrailingStop,
    LongHoldLoss,
}

impl ExitReason {
    /// Forced exits in the order the risk manager checks them.
    pub const FORCED: [ExitReason; 4] = [
        ExitReason::StopLoss,
        ExitReason::TakeProfit,
        ExitReason::TrailingStop,
        ExitReason::LongHoldLoss,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExitReason::Signal => "SIGNAL",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::LongHoldLoss => "LONG_HOLD_LOSS",
        }
    }

    /// Exits forced by the risk manager rather than a sell signal.
    pub fn is_forced(self) -> bool {
        self != ExitReason::Signal
    }
}

/// One executed fill. Append-only.
///
/// `amount` is `shares × fill_price` before commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: TradeSide,
    pub shares: u64,
    pub fill_price: f64,
    pub amount: f64,
    pub commission: f64,
    pub confidence: f64,
    pub cash_after: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExitReason>,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.side == TradeSide::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == TradeSide::Sell
    }

    /// Cash delta of this fill including commission.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            TradeSide::Buy => -(self.amount + self.commission),
            TradeSide::Sell => self.amount - self.commission,
        }
    }
}

/// A completed buy → sell pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub shares: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// `(exit − entry) / entry` on fill prices, before commission.
    pub return_pct: f64,
    /// Cash in minus cash out, commission included.
    pub net_pnl: f64,
    pub holding_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy() -> Trade {
        Trade {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            side: TradeSide::Buy,
            shares: 10,
            fill_price: 100.0,
            amount: 1000.0,
            commission: 3.0,
            confidence: 0.8,
            cash_after: 8997.0,
            reason: None,
        }
    }

    #[test]
    fn buy_cash_flow_includes_commission() {
        assert_eq!(buy().cash_flow(), -1003.0);
    }

    #[test]
    fn sell_cash_flow_nets_commission() {
        let mut t = buy();
        t.side = TradeSide::Sell;
        t.reason = Some(ExitReason::StopLoss);
        assert_eq!(t.cash_flow(), 997.0);
        assert!(t.reason.is_some_and(ExitReason::is_forced));
    }

    #[test]
    fn exit_reason_wire_names() {
        let json = serde_json::to_string(&ExitReason::StopLoss).unwrap();
        assert_eq!(json, "\"STOP_LOSS\"");
        assert_eq!(ExitReason::LongHoldLoss.label(), "LONG_HOLD_LOSS");
    }

    #[test]
    fn buy_omits_reason_on_the_wire() {
        let json = serde_json::to_string(&buy()).unwrap();
        assert!(!json.contains("reason"));
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, buy());
    }
}
