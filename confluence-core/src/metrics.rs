//! Performance metrics — pure functions that compute run statistics.
//!
//! Every metric is a pure function: snapshot history and/or trade list in,
//! scalar out. Annualization follows the calendar convention (365.25 days per
//! year on the snapshot count) for returns and the trading convention (√252)
//! for volatility.

use serde::{Deserialize, Serialize};

use crate::domain::{PortfolioSnapshot, RoundTrip, Trade};

/// Calendar days per year for return annualization.
pub const DAYS_PER_YEAR: f64 = 365.25;
/// Trading days per year for volatility annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Infinite when there are round trips but no losing ones.
    #[serde(with = "non_finite")]
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    pub round_trips: usize,
    pub total_commission: f64,
    pub final_value: f64,
    pub profit_loss: f64,
    pub days: usize,
    pub years: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from the snapshot history, trade ledger and round trips.
    pub fn compute(
        history: &[PortfolioSnapshot],
        trades: &[Trade],
        round_trips: &[RoundTrip],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let days = history.len();
        let total = total_return(history);
        let annualized = annualized_return(total, days);
        let vol = volatility(history);
        let final_value = history.last().map_or(initial_capital, |s| s.total_value);

        Self {
            total_return: total,
            annualized_return: annualized,
            volatility: vol,
            sharpe: sharpe_ratio(annualized, vol, risk_free_rate),
            max_drawdown: max_drawdown(history),
            win_rate: win_rate(round_trips),
            profit_factor: profit_factor(round_trips),
            avg_win: avg_win(round_trips),
            avg_loss: avg_loss(round_trips),
            total_trades: trades.len(),
            buy_trades: trades.iter().filter(|t| t.is_buy()).count(),
            sell_trades: trades.iter().filter(|t| t.is_sell()).count(),
            round_trips: round_trips.len(),
            total_commission: sum_f64(trades.iter().map(|t| t.commission)),
            final_value,
            profit_loss: final_value - initial_capital,
            days,
            years: days as f64 / DAYS_PER_YEAR,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Cumulative return of the last snapshot.
pub fn total_return(history: &[PortfolioSnapshot]) -> f64 {
    history.last().map_or(0.0, |s| s.cumulative_return)
}

/// `(1 + total)^(365.25 / days) − 1`. Total loss maps to −1.
pub fn annualized_return(total_return: f64, days: usize) -> f64 {
    if days == 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(DAYS_PER_YEAR / days as f64) - 1.0
}

/// Sample standard deviation of period returns × √252.
pub fn volatility(history: &[PortfolioSnapshot]) -> f64 {
    let returns: Vec<f64> = history.iter().map(|s| s.period_return).collect();
    std_dev(&returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// `(annualized − rf) / volatility`; 0 when volatility is 0.
pub fn sharpe_ratio(annualized_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility < 1e-15 {
        return 0.0;
    }
    (annualized_return - risk_free_rate) / volatility
}

/// Maximum drawdown as a non-positive fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(history: &[PortfolioSnapshot]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for snap in history {
        let value = snap.total_value;
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((value - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of round trips with a positive return.
pub fn win_rate(round_trips: &[RoundTrip]) -> f64 {
    if round_trips.is_empty() {
        return 0.0;
    }
    let winners = round_trips.iter().filter(|r| r.is_winner()).count();
    winners as f64 / round_trips.len() as f64
}

/// Sum of winning returns over the absolute sum of losing returns.
///
/// 0 with no round trips, infinite with round trips but no losses.
pub fn profit_factor(round_trips: &[RoundTrip]) -> f64 {
    if round_trips.is_empty() {
        return 0.0;
    }
    let gross_profit = sum_f64(
        round_trips
            .iter()
            .filter(|r| r.return_pct > 0.0)
            .map(|r| r.return_pct),
    );
    let gross_loss = sum_f64(
        round_trips
            .iter()
            .filter(|r| r.return_pct < 0.0)
            .map(|r| r.return_pct.abs()),
    );

    if gross_loss == 0.0 {
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}

/// Mean return of winning round trips.
pub fn avg_win(round_trips: &[RoundTrip]) -> f64 {
    let wins: Vec<f64> = round_trips
        .iter()
        .filter(|r| r.return_pct > 0.0)
        .map(|r| r.return_pct)
        .collect();
    mean_f64(&wins)
}

/// Absolute mean return of losing round trips.
pub fn avg_loss(round_trips: &[RoundTrip]) -> f64 {
    let losses: Vec<f64> = round_trips
        .iter()
        .filter(|r| r.return_pct < 0.0)
        .map(|r| r.return_pct)
        .collect();
    mean_f64(&losses).abs()
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Sum starting from `+0.0`, so an empty input is never `-0.0`.
pub(crate) fn sum_f64(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc + v)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Serialize non-finite floats as `"inf"`, `"-inf"` and `"nan"`.
pub mod non_finite {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("nan")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Num(v) => Ok(v),
            Repr::Text(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number or inf/-inf/nan, got '{other}'"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn history(values: &[f64]) -> Vec<PortfolioSnapshot> {
        let mut out = vec![PortfolioSnapshot::baseline(d(1), values[0])];
        for (i, &v) in values.iter().enumerate().skip(1) {
            let prev = &out[i - 1];
            out.push(PortfolioSnapshot::mark(d(1 + i as u32), v, 0, 0.0, prev));
        }
        out
    }

    fn round_trip(return_pct: f64) -> RoundTrip {
        RoundTrip {
            entry_date: d(2),
            exit_date: d(5),
            shares: 10,
            entry_price: 100.0,
            exit_price: 100.0 * (1.0 + return_pct),
            return_pct,
            net_pnl: 1000.0 * return_pct,
            holding_days: 3,
            exit_reason: None,
        }
    }

    #[test]
    fn total_return_is_last_cumulative() {
        let h = history(&[100.0, 110.0, 121.0]);
        assert!((total_return(&h) - 0.21).abs() < 1e-12);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn annualized_return_over_a_year() {
        let a = annualized_return(0.10, 365);
        assert!(a > 0.10 && a < 0.1003);
        assert_eq!(annualized_return(0.1, 0), 0.0);
        assert_eq!(annualized_return(-1.5, 100), -1.0);
    }

    #[test]
    fn volatility_constant_is_zero() {
        let h = history(&[100.0, 100.0, 100.0, 100.0]);
        assert_eq!(volatility(&h), 0.0);
        assert_eq!(sharpe_ratio(0.1, 0.0, 0.03), 0.0);
    }

    #[test]
    fn sharpe_uses_annualized_excess() {
        assert!((sharpe_ratio(0.13, 0.2, 0.03) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_known() {
        let h = history(&[100.0, 120.0, 90.0, 130.0]);
        assert!((max_drawdown(&h) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_increase() {
        let h = history(&[100.0, 101.0, 102.0]);
        assert_eq!(max_drawdown(&h), 0.0);
    }

    #[test]
    fn win_rate_mixed() {
        let trips = vec![round_trip(0.1), round_trip(-0.05), round_trip(0.02), round_trip(-0.01)];
        assert!((win_rate(&trips) - 0.5).abs() < 1e-12);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn profit_factor_mixed() {
        let trips = vec![round_trip(0.12), round_trip(-0.04), round_trip(-0.02)];
        assert!((profit_factor(&trips) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        assert!(profit_factor(&[round_trip(0.05)]).is_infinite());
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn all_losing_trips_give_positive_zero_profit_factor() {
        let pf = profit_factor(&[round_trip(-0.04), round_trip(-0.02)]);
        assert_eq!(pf, 0.0);
        assert!(pf.is_sign_positive());
    }

    #[test]
    fn no_trades_give_positive_zero_commission() {
        let h = history(&[1000.0, 990.0]);
        let metrics = PerformanceMetrics::compute(&h, &[], &[round_trip(-0.01)], 1000.0, 0.03);
        assert!(metrics.total_commission.is_sign_positive());
        assert_eq!(metrics.profit_factor, 0.0);
        assert!(metrics.profit_factor.is_sign_positive());
    }

    #[test]
    fn averages_split_by_sign() {
        let trips = vec![round_trip(0.10), round_trip(0.20), round_trip(-0.06)];
        assert!((avg_win(&trips) - 0.15).abs() < 1e-12);
        assert!((avg_loss(&trips) - 0.06).abs() < 1e-12);
    }

    #[test]
    fn infinite_profit_factor_serializes_as_text() {
        let h = history(&[100.0, 110.0]);
        let metrics = PerformanceMetrics::compute(&h, &[], &[round_trip(0.1)], 100.0, 0.03);
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(json.contains("\"profit_factor\":\"inf\""));
        let back: PerformanceMetrics = serde_json::from_str(&json).unwrap();
        assert!(back.profit_factor.is_infinite());
        assert_eq!(back.days, 2);
    }

    #[test]
    fn compute_counts_and_value() {
        let h = history(&[1000.0, 1100.0]);
        let metrics = PerformanceMetrics::compute(&h, &[], &[], 1000.0, 0.03);
        assert_eq!(metrics.final_value, 1100.0);
        assert_eq!(metrics.profit_loss, 100.0);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.profit_factor, 0.0);
    }
}
