//! Trade extraction — pairs the fill ledger into round-trip records.
//!
//! Post-processes the ledger after the day loop completes. Each BUY opens a
//! trip and the next SELL closes it. A BUY still open at the end of the run
//! produces no round trip.

use crate::domain::{RoundTrip, Trade, TradeSide};

/// Pair each BUY with the following SELL.
pub fn extract_round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<&Trade> = None;

    for trade in trades {
        match trade.side {
            TradeSide::Buy => open = Some(trade),
            TradeSide::Sell => {
                if let Some(entry) = open.take() {
                    trips.push(build_round_trip(entry, trade));
                }
            }
        }
    }
    trips
}

fn build_round_trip(entry: &Trade, exit: &Trade) -> RoundTrip {
    let return_pct = if entry.fill_price > 0.0 {
        (exit.fill_price - entry.fill_price) / entry.fill_price
    } else {
        0.0
    };
    RoundTrip {
        entry_date: entry.date,
        exit_date: exit.date,
        shares: exit.shares,
        entry_price: entry.fill_price,
        exit_price: exit.fill_price,
        return_pct,
        net_pnl: entry.cash_flow() + exit.cash_flow(),
        holding_days: (exit.date - entry.date).num_days(),
        exit_reason: exit.reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExitReason;
    use chrono::NaiveDate;

    fn trade(day: u32, side: TradeSide, price: f64) -> Trade {
        let shares = 10;
        let amount = shares as f64 * price;
        Trade {
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            side,
            shares,
            fill_price: price,
            amount,
            commission: amount * 0.001,
            confidence: 0.8,
            cash_after: 0.0,
            reason: (side == TradeSide::Sell).then_some(ExitReason::Signal),
        }
    }

    #[test]
    fn pairs_buy_with_next_sell() {
        let trades = vec![
            trade(1, TradeSide::Buy, 100.0),
            trade(5, TradeSide::Sell, 110.0),
            trade(8, TradeSide::Buy, 105.0),
            trade(12, TradeSide::Sell, 94.5),
        ];
        let trips = extract_round_trips(&trades);
        assert_eq!(trips.len(), 2);
        assert!((trips[0].return_pct - 0.10).abs() < 1e-12);
        assert!((trips[1].return_pct + 0.10).abs() < 1e-12);
        assert_eq!(trips[0].holding_days, 4);
        // 1100 − 1.1 − (1000 + 1.0)
        assert!((trips[0].net_pnl - 97.9).abs() < 1e-9);
    }

    #[test]
    fn open_buy_is_not_a_round_trip() {
        let trades = vec![
            trade(1, TradeSide::Buy, 100.0),
            trade(5, TradeSide::Sell, 110.0),
            trade(8, TradeSide::Buy, 105.0),
        ];
        assert_eq!(extract_round_trips(&trades).len(), 1);
    }

    #[test]
    fn orphan_sell_is_ignored() {
        let trades = vec![trade(5, TradeSide::Sell, 110.0)];
        assert!(extract_round_trips(&trades).is_empty());
    }
}
