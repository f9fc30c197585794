use serde::{Deserialize, Serialize};

use crate::error::{open_unit, ConfigError};

/// Risk limits applied to every position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskConfig {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_stop_pct: f64,
    pub max_position_pct: f64,
    /// Scale sizing down and widen stops when volatility is known.
    pub volatility_adjustment: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.10,
            take_profit_pct: 0.20,
            trailing_stop_pct: 0.05,
            max_position_pct: 0.95,
            volatility_adjustment: true,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        open_unit("stop_loss_pct", self.stop_loss_pct)?;
        open_unit("take_profit_pct", self.take_profit_pct)?;
        open_unit("trailing_stop_pct", self.trailing_stop_pct)?;
        let max = self.max_position_pct;
        if !(max.is_finite() && max > 0.0 && max <= 1.0) {
            return Err(ConfigError::out_of_range("max_position_pct", "(0, 1]", max));
        }
        Ok(())
    }
}
