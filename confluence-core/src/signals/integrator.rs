//! SignalIntegrator — fuses per-indicator scores into one decision per day.
//!
//! Per row:
//! 1. every configured indicator votes Buy / Sell / Neutral on its score;
//! 2. the weighted sum of scores gives the aggregate strength;
//! 3. Buy is raised when enough indicators vote Buy and strength > 0.5,
//!    otherwise Sell when enough vote Sell and strength < −0.5;
//! 4. raised signals get a confidence from the agreeing count and a quality
//!    label from (agreeing, |strength|);
//! 5. raised signals below the confidence threshold are filtered out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::config::IntegratorConfig;
use crate::domain::{IntegratedSignal, ScoreRow, ScoreTable, SignalDirection, SignalQuality, Vote};
use crate::error::ConfigError;
use crate::metrics::sum_f64;

/// Aggregate strength a Buy must exceed (and a Sell must undercut, negated).
pub const STRENGTH_THRESHOLD: f64 = 0.5;

/// Ceiling on any confidence value.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Configured-indicator count at which the quality table shifts up a vote.
pub const EXTENDED_QUALITY_INDICATORS: usize = 7;

const FILTER_EPSILON: f64 = 1e-9;

/// Stateless apart from its validated configuration.
#[derive(Debug, Clone)]
pub struct SignalIntegrator {
    config: IntegratorConfig,
}

impl SignalIntegrator {
    pub fn new(config: IntegratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Integrate every row of the table, in date order.
    pub fn integrate(&self, table: &ScoreTable) -> Vec<IntegratedSignal> {
        let signals: Vec<IntegratedSignal> = table.iter().map(|row| self.integrate_row(row)).collect();

        if !signals.is_empty() {
            let buys = signals.iter().filter(|s| s.is_buy()).count();
            let sells = signals.iter().filter(|s| s.is_sell()).count();
            let filtered = signals.iter().filter(|s| s.is_filtered()).count();
            info!(
                days = signals.len(),
                buys,
                sells,
                filtered,
                "integrated signals"
            );
        }
        signals
    }

    /// Integrate a single day.
    pub fn integrate_row(&self, row: &ScoreRow) -> IntegratedSignal {
        let mut buy_votes = 0;
        let mut sell_votes = 0;
        for spec in &self.config.indicators {
            match spec.classify(row.score(&spec.id)) {
                Vote::Buy => buy_votes += 1,
                Vote::Sell => sell_votes += 1,
                Vote::Neutral => {}
            }
        }

        let strength = aggregate_strength(row, &self.config.weights);
        let min = self.config.min_indicators;

        let (candidate, agreeing) = if buy_votes >= min && strength > STRENGTH_THRESHOLD {
            (SignalDirection::Buy, buy_votes)
        } else if sell_votes >= min && strength < -STRENGTH_THRESHOLD {
            (SignalDirection::Sell, sell_votes)
        } else {
            return IntegratedSignal::none(row.date, strength, buy_votes, sell_votes);
        };

        let confidence = confidence(agreeing);
        let mut signal = IntegratedSignal {
            date: row.date,
            direction: candidate,
            candidate,
            aggregate_strength: strength,
            agreeing_indicators: agreeing,
            buy_votes,
            sell_votes,
            confidence,
            quality: quality(agreeing, strength.abs(), self.config.indicators.len()),
        };

        if confidence < self.config.confidence_threshold - FILTER_EPSILON {
            debug!(
                date = %row.date,
                ?candidate,
                confidence,
                threshold = self.config.confidence_threshold,
                "signal filtered out"
            );
            signal.direction = SignalDirection::None;
            signal.quality = SignalQuality::FilteredOut;
        }
        signal
    }

    /// Roll a signal stream up into counts and averages.
    pub fn summarize(&self, signals: &[IntegratedSignal]) -> IntegrationSummary {
        IntegrationSummary::from_signals(signals, &self.config.weights)
    }
}

// ─── Pure rules ──────────────────────────────────────────────────────

/// `Σ weight × score` over weighted indicators. Missing or NaN scores count 0.
pub fn aggregate_strength(row: &ScoreRow, weights: &BTreeMap<String, f64>) -> f64 {
    let strength = sum_f64(weights.iter().map(|(id, w)| w * row.score(id)));
    if strength.is_finite() {
        strength
    } else {
        0.0
    }
}

/// `min(0.95, 0.6 + (agreeing − 2) × 0.1)`, clipped to `[0, 0.95]`.
pub fn confidence(agreeing: usize) -> f64 {
    let raw = 0.6 + (agreeing as f64 - 2.0) * 0.1;
    raw.clamp(0.0, MAX_CONFIDENCE)
}

/// Quality label from the agreeing count and absolute strength.
///
/// With seven or more configured indicators every vote requirement rises by one.
pub fn quality(agreeing: usize, abs_strength: f64, configured: usize) -> SignalQuality {
    let shift = usize::from(configured >= EXTENDED_QUALITY_INDICATORS);
    if agreeing >= 5 + shift && abs_strength > 0.8 {
        SignalQuality::Excellent
    } else if agreeing >= 4 + shift && abs_strength > 0.7 {
        SignalQuality::VeryGood
    } else if agreeing >= 3 + shift && abs_strength > 0.6 {
        SignalQuality::Good
    } else if agreeing >= 3 && abs_strength > 0.5 {
        SignalQuality::Fair
    } else {
        SignalQuality::Weak
    }
}

// ─── Summary ─────────────────────────────────────────────────────────

/// Counts and averages over an integrated signal stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationSummary {
    pub days: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub filtered_signals: usize,
    /// Mean confidence of signals that survived the filter; 0 when none did.
    pub average_confidence: f64,
    pub quality_counts: BTreeMap<String, usize>,
    pub weights: BTreeMap<String, f64>,
    pub latest: Option<IntegratedSignal>,
}

impl IntegrationSummary {
    pub fn from_signals(signals: &[IntegratedSignal], weights: &BTreeMap<String, f64>) -> Self {
        let raised: Vec<&IntegratedSignal> = signals.iter().filter(|s| s.is_raised()).collect();
        let average_confidence = if raised.is_empty() {
            0.0
        } else {
            raised.iter().map(|s| s.confidence).sum::<f64>() / raised.len() as f64
        };

        let mut quality_counts = BTreeMap::new();
        for s in signals.iter().filter(|s| s.quality != SignalQuality::None) {
            *quality_counts.entry(s.quality.label().to_string()).or_insert(0) += 1;
        }

        Self {
            days: signals.len(),
            buy_signals: signals.iter().filter(|s| s.is_buy()).count(),
            sell_signals: signals.iter().filter(|s| s.is_sell()).count(),
            filtered_signals: signals.iter().filter(|s| s.is_filtered()).count(),
            average_confidence,
            quality_counts,
            weights: weights.clone(),
            latest: signals.last().cloned(),
        }
    }
}
