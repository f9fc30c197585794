//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{rate, ConfigError};
use crate::risk::RiskConfig;

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Fraction of traded value charged per side.
    pub commission_rate: f64,
    /// Fraction applied adversely to the close on every fill.
    pub slippage_rate: f64,
    /// Consult the risk manager for forced exits and stop placement.
    pub use_risk_management: bool,
    pub risk_free_rate: f64,
    /// Volatility used for sizing and stops when a bar carries none.
    pub assumed_volatility: Option<f64>,
    /// Key the position is registered under.
    pub symbol: String,
    pub risk: RiskConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000_000.0,
            commission_rate: 0.003,
            slippage_rate: 0.001,
            use_risk_management: true,
            risk_free_rate: 0.03,
            assumed_volatility: None,
            symbol: "BACKTEST".to_string(),
            risk: RiskConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    /// Zero commission and slippage.
    pub fn frictionless(mut self) -> Self {
        self.commission_rate = 0.0;
        self.slippage_rate = 0.0;
        self
    }

    pub fn with_risk_management(mut self, enabled: bool) -> Self {
        self.use_risk_management = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::InitialCapital(self.initial_capital));
        }
        rate("commission_rate", self.commission_rate)?;
        rate("slippage_rate", self.slippage_rate)?;
        rate("risk_free_rate", self.risk_free_rate)?;
        if let Some(vol) = self.assumed_volatility {
            if !(vol.is_finite() && vol >= 0.0) {
                return Err(ConfigError::out_of_range("assumed_volatility", "[0, inf)", vol));
            }
        }
        self.risk.validate()
    }
}
