//! TOML run configuration.
//!
//! A [`BacktestConfig`] file has three sections, every field optional.
//! Unknown keys are rejected. A `[signal.weights]` table replaces the
//! default weights as a whole, so it must list every weighted indicator:
//!
//! ```toml
//! [signal]
//! confidence_threshold = 0.7
//! min_indicators = 3
//! [signal.weights]
//! ma = 0.30
//! rsi = 0.20
//! macd = 0.30
//! bb = 0.10
//! volume = 0.10
//!
//! [risk]
//! stop_loss_pct = 0.10
//!
//! [backtest]
//! symbol = "005930"
//! initial_capital = 10000000.0
//! start_date = "2023-01-01"
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use confluence_core::engine::EngineConfig;
use confluence_core::risk::RiskConfig;
use confluence_core::signals::IntegratorConfig;

/// Content hash of a configuration, hex encoded.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(String),
    #[error("invalid config: {0}")]
    Invalid(#[from] confluence_core::ConfigError),
    #[error("start_date {start} is after end_date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },
}

/// The `[backtest]` section: capital, costs and the date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub symbol: String,
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub use_risk_management: bool,
    pub risk_free_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumed_volatility: Option<f64>,
    /// Inclusive lower bound on bar dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on bar dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            symbol: engine.symbol,
            initial_capital: engine.initial_capital,
            commission_rate: engine.commission_rate,
            slippage_rate: engine.slippage_rate,
            use_risk_management: engine.use_risk_management,
            risk_free_rate: engine.risk_free_rate,
            assumed_volatility: engine.assumed_volatility,
            start_date: None,
            end_date: None,
        }
    }
}

/// Everything needed to reproduce one backtest, apart from the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    pub signal: IntegratorConfig,
    pub risk: RiskConfig,
    pub backtest: BacktestSection,
}

impl BacktestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.backtest.symbol = symbol.into();
        self
    }

    /// Validate every section against the core constructors' rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal.validate()?;
        self.engine_config().validate()?;
        if let (Some(start), Some(end)) = (self.backtest.start_date, self.backtest.end_date) {
            if start > end {
                return Err(ConfigError::DateRange { start, end });
            }
        }
        Ok(())
    }

    pub fn integrator_config(&self) -> IntegratorConfig {
        self.signal.clone()
    }

    pub fn engine_config(&self) -> EngineConfig {
        let b = &self.backtest;
        EngineConfig {
            initial_capital: b.initial_capital,
            commission_rate: b.commission_rate,
            slippage_rate: b.slippage_rate,
            use_risk_management: b.use_risk_management,
            risk_free_rate: b.risk_free_rate,
            assumed_volatility: b.assumed_volatility,
            symbol: b.symbol.clone(),
            risk: self.risk.clone(),
        }
    }

    /// BLAKE3 of the canonical JSON form. Identical configs share an id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_vec(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}
