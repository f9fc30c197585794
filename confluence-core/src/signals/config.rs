//! Integrator configuration, validated once before any integration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::indicator::IndicatorSpec;
use crate::error::ConfigError;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.05;

/// Settings for [`SignalIntegrator`](super::SignalIntegrator).
///
/// Indicators without a weight still vote but add nothing to the
/// aggregate strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    pub confidence_threshold: f64,
    pub min_indicators: usize,
    pub indicators: Vec<IndicatorSpec>,
    pub weights: BTreeMap<String, f64>,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            min_indicators: 3,
            indicators: default_indicators(),
            weights: default_weights(),
        }
    }
}

/// The five standard indicators: ma, rsi, macd, bb, volume.
pub fn default_indicators() -> Vec<IndicatorSpec> {
    vec![
        IndicatorSpec::ma(),
        IndicatorSpec::rsi(),
        IndicatorSpec::macd(),
        IndicatorSpec::bb(),
        IndicatorSpec::volume(),
    ]
}

pub fn default_weights() -> BTreeMap<String, f64> {
    [
        ("ma", 0.25),
        ("rsi", 0.20),
        ("macd", 0.25),
        ("bb", 0.15),
        ("volume", 0.15),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl IntegratorConfig {
    /// Add an indicator spec, replacing any spec with the same id.
    pub fn with_indicator(mut self, spec: IndicatorSpec) -> Self {
        self.indicators.retain(|s| s.id != spec.id);
        self.indicators.push(spec);
        self
    }

    pub fn with_weights(mut self, weights: BTreeMap<String, f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn indicator(&self, id: &str) -> Option<&IndicatorSpec> {
        self.indicators.iter().find(|s| s.id == id)
    }

    pub fn weight(&self, id: &str) -> f64 {
        self.weights.get(id).copied().unwrap_or(0.0)
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Reject anything that would make integration ill-defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.confidence_threshold.is_finite() || !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::out_of_range(
                "confidence_threshold",
                "[0, 1]",
                self.confidence_threshold,
            ));
        }
        if self.min_indicators == 0 {
            return Err(ConfigError::MinIndicators);
        }
        if self.indicators.is_empty() {
            return Err(ConfigError::NoIndicators);
        }

        let mut seen = BTreeSet::new();
        for spec in &self.indicators {
            spec.validate()?;
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateIndicator(spec.id.clone()));
            }
        }

        for (id, &value) in &self.weights {
            if !seen.contains(id.as_str()) {
                return Err(ConfigError::UnknownWeightKey(id.clone()));
            }
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    id: id.clone(),
                    value,
                });
            }
        }

        let sum = self.weight_sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum {
                sum,
                tolerance: WEIGHT_SUM_TOLERANCE,
            });
        }
        Ok(())
    }
}
