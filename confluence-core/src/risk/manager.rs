//! RiskManager — position sizing, protective levels, and forced exits.
//!
//! Owns the `PositionRegistry`. One instance per run; nothing is global.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::config::RiskConfig;
use super::ratchet::ratchet_up;
use super::registry::PositionRegistry;
use crate::domain::{ExitReason, Position};
use crate::error::ConfigError;

/// The trailing stop only fires once the high is this multiple of entry.
pub const TRAILING_ARM_MULTIPLE: f64 = 1.05;
/// Minimum holding period (calendar days) for the long-hold exit.
pub const LONG_HOLD_DAYS: i64 = 90;
/// Entries below this confidence are eligible for the long-hold exit.
pub const LONG_HOLD_MAX_CONFIDENCE: f64 = 0.7;
/// Return below which a long hold is cut.
pub const LONG_HOLD_MIN_RETURN: f64 = -0.05;

const CONFIDENCE_SIZE_MULTIPLIER: f64 = 1.2;
const MIN_VOLATILITY_SCALE: f64 = 0.3;
const MAX_VOLATILITY_WIDENING: f64 = 0.5;
const HIGH_CONFIDENCE: f64 = 0.8;
const LOW_CONFIDENCE: f64 = 0.6;

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    pub investment: f64,
    pub shares: u64,
}

impl PositionSize {
    pub const ZERO: PositionSize = PositionSize {
        investment: 0.0,
        shares: 0,
    };
}

/// Levels set on entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLevels {
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub trailing_stop_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

/// Position state at the time of an exit check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitDetails {
    pub entry_price: f64,
    pub current_price: f64,
    pub current_return: f64,
    pub holding_days: i64,
    pub highest_price: f64,
    /// Level of the rule that fired, if one did.
    pub target_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitDecision {
    pub reason: Option<ExitReason>,
    /// `None` when there was no position to check.
    pub details: Option<ExitDetails>,
}

impl ExitDecision {
    fn no_position() -> Self {
        Self {
            reason: None,
            details: None,
        }
    }

    pub fn should_exit(&self) -> bool {
        self.reason.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Aggregate exposure of all open positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRisk {
    pub total_value: f64,
    /// Loss if every position fell to its stop, ignoring positions above water.
    pub potential_loss: f64,
    pub risk_ratio: f64,
    pub level: RiskLevel,
    pub positions: usize,
}

// ─── Manager ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    registry: PositionRegistry,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: PositionRegistry::new(),
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Size a new position.
    ///
    /// `fraction = min(max_position_pct, confidence × 1.2)`, scaled by
    /// `max(0.3, 1 − volatility)` when volatility is known.
    pub fn calculate_position_size(
        &self,
        available_cash: f64,
        price: f64,
        confidence: f64,
        volatility: Option<f64>,
    ) -> PositionSize {
        if !(price.is_finite() && price > 0.0) || !(available_cash.is_finite() && available_cash > 0.0) {
            return PositionSize::ZERO;
        }

        let confidence = if confidence.is_finite() { confidence.max(0.0) } else { 0.0 };
        let mut fraction = self
            .config
            .max_position_pct
            .min(confidence * CONFIDENCE_SIZE_MULTIPLIER);
        if let Some(vol) = self.volatility(volatility) {
            fraction *= MIN_VOLATILITY_SCALE.max(1.0 - vol);
        }

        let shares = (available_cash * fraction / price).floor();
        if shares < 1.0 {
            return PositionSize::ZERO;
        }
        let shares = shares as u64;
        PositionSize {
            investment: shares as f64 * price,
            shares,
        }
    }

    /// Compute protective levels for a new entry and register the position.
    ///
    /// Replaces any existing position for `symbol`.
    pub fn set_position_stops(
        &mut self,
        symbol: &str,
        entry_price: f64,
        entry_date: NaiveDate,
        shares: u64,
        confidence: f64,
        volatility: Option<f64>,
    ) -> StopLevels {
        let levels = self.stop_levels(entry_price, confidence, volatility);

        self.registry.open(Position {
            symbol: symbol.to_string(),
            entry_price,
            entry_date,
            shares,
            stop_loss_price: levels.stop_loss_price,
            take_profit_price: levels.take_profit_price,
            trailing_stop_price: levels.trailing_stop_price,
            highest_price_since_entry: entry_price,
            entry_confidence: confidence,
            stop_loss_pct: levels.stop_loss_pct,
            take_profit_pct: levels.take_profit_pct,
        });

        info!(
            symbol,
            entry_price,
            stop_loss = levels.stop_loss_price,
            take_profit = levels.take_profit_price,
            trailing_stop = levels.trailing_stop_price,
            "position stops set"
        );
        levels
    }

    /// Levels for an entry, without touching the registry.
    pub fn stop_levels(&self, entry_price: f64, confidence: f64, volatility: Option<f64>) -> StopLevels {
        let mut sl = self.config.stop_loss_pct;
        let mut tp = self.config.take_profit_pct;

        if confidence >= HIGH_CONFIDENCE {
            sl *= 1.2;
            tp *= 1.3;
        } else if confidence <= LOW_CONFIDENCE {
            sl *= 0.8;
            tp *= 0.9;
        }

        if let Some(vol) = self.volatility(volatility) {
            let widen = 1.0 + vol.min(MAX_VOLATILITY_WIDENING);
            sl *= widen;
            tp *= widen;
        }

        StopLevels {
            stop_loss_price: entry_price * (1.0 - sl),
            take_profit_price: entry_price * (1.0 + tp),
            trailing_stop_price: entry_price * (1.0 - self.config.trailing_stop_pct),
            stop_loss_pct: sl,
            take_profit_pct: tp,
        }
    }

    /// Evaluate forced-exit rules for `symbol` at `current_price`.
    ///
    /// Updates the high-water mark and trailing stop as a side effect. Rules
    /// are checked in order: stop-loss, take-profit, trailing stop, long hold.
    pub fn check_exit_conditions(
        &mut self,
        symbol: &str,
        current_price: f64,
        current_date: NaiveDate,
    ) -> ExitDecision {
        let trailing_pct = self.config.trailing_stop_pct;
        let Some(position) = self.registry.get_mut(symbol) else {
            return ExitDecision::no_position();
        };

        if current_price > position.highest_price_since_entry {
            position.highest_price_since_entry = current_price;
        }
        position.trailing_stop_price = ratchet_up(
            position.trailing_stop_price,
            position.highest_price_since_entry * (1.0 - trailing_pct),
        );

        let mut details = ExitDetails {
            entry_price: position.entry_price,
            current_price,
            current_return: position.current_return(current_price),
            holding_days: position.holding_days(current_date),
            highest_price: position.highest_price_since_entry,
            target_price: None,
        };

        let armed = position.highest_price_since_entry >= position.entry_price * TRAILING_ARM_MULTIPLE;
        let (reason, target) = if current_price <= position.stop_loss_price {
            (Some(ExitReason::StopLoss), Some(position.stop_loss_price))
        } else if current_price >= position.take_profit_price {
            (Some(ExitReason::TakeProfit), Some(position.take_profit_price))
        } else if current_price <= position.trailing_stop_price && armed {
            (Some(ExitReason::TrailingStop), Some(position.trailing_stop_price))
        } else if details.holding_days >= LONG_HOLD_DAYS
            && position.entry_confidence < LONG_HOLD_MAX_CONFIDENCE
            && details.current_return < LONG_HOLD_MIN_RETURN
        {
            (
                Some(ExitReason::LongHoldLoss),
                Some(position.entry_price * (1.0 + LONG_HOLD_MIN_RETURN)),
            )
        } else {
            (None, None)
        };

        if let Some(reason) = reason {
            debug!(
                symbol,
                reason = reason.label(),
                current_price,
                holding_days = details.holding_days,
                "exit condition met"
            );
        }
        details.target_price = target;
        ExitDecision {
            reason,
            details: Some(details),
        }
    }

    /// Remove the position for `symbol`. False when there was none.
    pub fn close_position(&mut self, symbol: &str) -> bool {
        match self.registry.remove(symbol) {
            Some(_) => {
                info!(symbol, "position closed");
                true
            }
            None => false,
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.registry.get(symbol)
    }

    pub fn positions(&self) -> &PositionRegistry {
        &self.registry
    }

    /// Drop every open position.
    pub fn reset(&mut self) {
        self.registry.clear();
    }

    /// Exposure of all open positions at `prices`.
    ///
    /// Positions without a price are counted but contribute no value.
    pub fn portfolio_risk(&self, prices: &BTreeMap<String, f64>) -> PortfolioRisk {
        let mut total_value = 0.0;
        let mut potential_loss = 0.0;
        for position in self.registry.iter() {
            if let Some(&price) = prices.get(&position.symbol) {
                let shares = position.shares as f64;
                total_value += shares * price;
                potential_loss += (shares * (price - position.stop_loss_price)).max(0.0);
            }
        }

        let risk_ratio = if total_value > 0.0 {
            potential_loss / total_value
        } else {
            0.0
        };
        let level = if risk_ratio > 0.15 {
            RiskLevel::High
        } else if risk_ratio > 0.08 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        PortfolioRisk {
            total_value,
            potential_loss,
            risk_ratio,
            level,
            positions: self.registry.len(),
        }
    }

    fn volatility(&self, volatility: Option<f64>) -> Option<f64> {
        if !self.config.volatility_adjustment {
            return None;
        }
        volatility.filter(|v| v.is_finite() && *v >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn manager() -> RiskManager {
        RiskManager::new(RiskConfig::default()).unwrap()
    }

    #[test]
    fn size_is_capped_by_max_position() {
        let rm = manager();
        let size = rm.calculate_position_size(1_000_000.0, 100.0, 0.9, None);
        assert_eq!(size.shares, 9_500);
        assert_eq!(size.investment, 950_000.0);
    }

    #[test]
    fn low_confidence_sizes_smaller() {
        let rm = manager();
        let size = rm.calculate_position_size(1_000_000.0, 100.0, 0.5, None);
        assert_eq!(size.shares, 6_000);
    }

    #[test]
    fn volatility_scales_size_with_floor() {
        let rm = manager();
        let size = rm.calculate_position_size(1_000_000.0, 100.0, 0.9, Some(0.2));
        assert_eq!(size.shares, 7_600);
        let floored = rm.calculate_position_size(1_000_000.0, 100.0, 0.9, Some(0.9));
        assert_eq!(floored.shares, 2_850);
    }

    #[test]
    fn unaffordable_share_is_zero() {
        let rm = manager();
        assert_eq!(rm.calculate_position_size(50.0, 100.0, 0.9, None), PositionSize::ZERO);
        assert_eq!(rm.calculate_position_size(1e6, f64::NAN, 0.9, None), PositionSize::ZERO);
    }

    #[test]
    fn high_confidence_widens_stops() {
        let rm = manager();
        let levels = rm.stop_levels(100.0, 0.85, None);
        assert!((levels.stop_loss_price - 88.0).abs() < 1e-9);
        assert!((levels.take_profit_price - 126.0).abs() < 1e-9);
        assert!((levels.trailing_stop_price - 95.0).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_tightens_stops() {
        let rm = manager();
        let levels = rm.stop_levels(100.0, 0.6, None);
        assert!((levels.stop_loss_price - 92.0).abs() < 1e-9);
        assert!((levels.take_profit_price - 118.0).abs() < 1e-9);
    }

    #[test]
    fn volatility_widening_is_capped() {
        let rm = manager();
        let levels = rm.stop_levels(100.0, 0.7, Some(0.9));
        assert!((levels.stop_loss_pct - 0.15).abs() < 1e-12);
        assert!((levels.take_profit_pct - 0.30).abs() < 1e-12);
    }

    #[test]
    fn no_position_means_no_exit() {
        let mut rm = manager();
        let decision = rm.check_exit_conditions("X", 100.0, d(2024, 1, 2));
        assert!(!decision.should_exit());
        assert!(decision.details.is_none());
    }

    #[test]
    fn trailing_stop_requires_arming() {
        let mut rm = manager();
        rm.set_position_stops("X", 100.0, d(2024, 1, 2), 10, 0.7, None);
        // up 4%: trailing moves to 98.8 but is not armed
        assert!(!rm.check_exit_conditions("X", 104.0, d(2024, 1, 3)).should_exit());
        let decision = rm.check_exit_conditions("X", 98.5, d(2024, 1, 4));
        assert_eq!(decision.reason, None);
        // up 10%, then back under 110 × 0.95 = 104.5
        assert!(!rm.check_exit_conditions("X", 110.0, d(2024, 1, 5)).should_exit());
        let decision = rm.check_exit_conditions("X", 104.0, d(2024, 1, 8));
        assert_eq!(decision.reason, Some(ExitReason::TrailingStop));
        let details = decision.details.unwrap();
        assert!((details.target_price.unwrap() - 104.5).abs() < 1e-9);
        assert_eq!(details.highest_price, 110.0);
    }

    #[test]
    fn trailing_stop_never_falls() {
        let mut rm = manager();
        rm.set_position_stops("X", 100.0, d(2024, 1, 2), 10, 0.7, None);
        rm.check_exit_conditions("X", 108.0, d(2024, 1, 3));
        let high = rm.position("X").unwrap().trailing_stop_price;
        rm.check_exit_conditions("X", 103.0, d(2024, 1, 4));
        assert_eq!(rm.position("X").unwrap().trailing_stop_price, high);
    }

    #[test]
    fn long_hold_loss_after_ninety_days() {
        let mut rm = manager();
        rm.set_position_stops("X", 100.0, d(2024, 1, 1), 10, 0.65, None);
        assert!(!rm.check_exit_conditions("X", 94.0, d(2024, 3, 30)).should_exit());
        let decision = rm.check_exit_conditions("X", 94.0, d(2024, 3, 31));
        assert_eq!(decision.reason, Some(ExitReason::LongHoldLoss));
    }

    #[test]
    fn close_position_is_idempotent() {
        let mut rm = manager();
        rm.set_position_stops("X", 100.0, d(2024, 1, 1), 10, 0.7, None);
        assert!(rm.close_position("X"));
        assert!(!rm.close_position("X"));
        assert!(rm.positions().is_empty());
    }

    #[test]
    fn portfolio_risk_levels() {
        let mut rm = manager();
        rm.set_position_stops("A", 100.0, d(2024, 1, 1), 10, 0.7, None);
        let mut prices = BTreeMap::new();
        prices.insert("A".to_string(), 100.0);
        let risk = rm.portfolio_risk(&prices);
        assert!((risk.risk_ratio - 0.10).abs() < 1e-9);
        assert_eq!(risk.level, RiskLevel::Medium);

        prices.insert("A".to_string(), 120.0);
        assert_eq!(rm.portfolio_risk(&prices).level, RiskLevel::High);

        prices.insert("A".to_string(), 85.0);
        let risk = rm.portfolio_risk(&prices);
        assert_eq!(risk.potential_loss, 0.0);
        assert_eq!(risk.level, RiskLevel::Low);
    }
}
