//! Per-indicator normalization and voting rules.

use serde::{Deserialize, Serialize};

use crate::domain::score::normalize;
use crate::domain::Vote;
use crate::error::ConfigError;

/// How one indicator's feed is read: its strength scale and vote threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorSpec {
    pub id: String,
    /// Strength that maps to a score of ±1.
    pub max_strength: f64,
    /// A score beyond ±threshold counts as a vote.
    pub vote_threshold: f64,
}

impl IndicatorSpec {
    pub fn new(id: impl Into<String>, max_strength: f64, vote_threshold: f64) -> Self {
        Self {
            id: id.into(),
            max_strength,
            vote_threshold,
        }
    }

    pub fn ma() -> Self {
        Self::new("ma", 3.0, 0.3)
    }

    pub fn rsi() -> Self {
        Self::new("rsi", 2.0, 0.5)
    }

    pub fn macd() -> Self {
        Self::new("macd", 3.0, 0.3)
    }

    pub fn bb() -> Self {
        Self::new("bb", 3.0, 0.3)
    }

    pub fn volume() -> Self {
        Self::new("volume", 3.0, 0.3)
    }

    pub fn stoch() -> Self {
        Self::new("stoch", 3.0, 0.3)
    }

    /// `strength / max_strength`, clamped to `[-1, 1]`.
    pub fn normalize(&self, strength: f64) -> f64 {
        normalize(strength, self.max_strength)
    }

    /// Buy above `+threshold`, Sell below `−threshold`, otherwise Neutral.
    pub fn classify(&self, score: f64) -> Vote {
        classify(score, self.vote_threshold)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::InvalidIndicator {
                id: self.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if !self.max_strength.is_finite() || self.max_strength <= 0.0 {
            return Err(ConfigError::InvalidIndicator {
                id: self.id.clone(),
                reason: format!("max_strength must be positive, got {}", self.max_strength),
            });
        }
        if !self.vote_threshold.is_finite() || !(0.0..1.0).contains(&self.vote_threshold) {
            return Err(ConfigError::InvalidIndicator {
                id: self.id.clone(),
                reason: format!("vote_threshold must be in [0, 1), got {}", self.vote_threshold),
            });
        }
        Ok(())
    }
}

/// Classify a normalized score against a symmetric threshold. NaN is Neutral.
pub fn classify(score: f64, threshold: f64) -> Vote {
    if score > threshold {
        Vote::Buy
    } else if score < -threshold {
        Vote::Sell
    } else {
        Vote::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_strict_threshold() {
        assert_eq!(classify(0.31, 0.3), Vote::Buy);
        assert_eq!(classify(0.3, 0.3), Vote::Neutral);
        assert_eq!(classify(-0.31, 0.3), Vote::Sell);
        assert_eq!(classify(f64::NAN, 0.3), Vote::Neutral);
    }

    #[test]
    fn rsi_needs_half_score() {
        let rsi = IndicatorSpec::rsi();
        // strength 1 of 2 sits exactly on the threshold
        assert_eq!(rsi.classify(rsi.normalize(1.0)), Vote::Neutral);
        assert_eq!(rsi.classify(rsi.normalize(2.0)), Vote::Buy);
        assert_eq!(rsi.classify(rsi.normalize(-2.0)), Vote::Sell);
    }

    #[test]
    fn one_third_strength_votes_for_ma() {
        let ma = IndicatorSpec::ma();
        assert_eq!(ma.classify(ma.normalize(1.0)), Vote::Buy);
    }

    #[test]
    fn rejects_zero_scale() {
        assert!(IndicatorSpec::new("x", 0.0, 0.3).validate().is_err());
        assert!(IndicatorSpec::new("", 3.0, 0.3).validate().is_err());
        assert!(IndicatorSpec::new("x", 3.0, 1.2).validate().is_err());
        assert!(IndicatorSpec::stoch().validate().is_ok());
    }
}
