//! Cost model — slippage and commission calculation.
//!
//! Slippage is directional: buyers pay more, sellers receive less.
//! Commission is a flat rate on traded value, charged on both sides.

/// Execution friction as fractions of price and traded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub slippage_rate: f64,
    pub commission_rate: f64,
}

impl CostModel {
    pub fn new(slippage_rate: f64, commission_rate: f64) -> Self {
        Self {
            slippage_rate,
            commission_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// `close × (1 + slippage)`
    pub fn buy_price(&self, close: f64) -> f64 {
        close * (1.0 + self.slippage_rate)
    }

    /// `close × (1 − slippage)`
    pub fn sell_price(&self, close: f64) -> f64 {
        close * (1.0 - self.slippage_rate)
    }

    pub fn commission(&self, amount: f64) -> f64 {
        amount * self.commission_rate
    }

    /// Largest amount that can be invested so that amount plus commission fits in `cash`.
    pub fn investable_cash(&self, cash: f64) -> f64 {
        cash / (1.0 + self.commission_rate)
    }
}
