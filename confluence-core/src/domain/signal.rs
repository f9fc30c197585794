//! IntegratedSignal — one fused trading decision per day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of an integrated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Buy,
    Sell,
    None,
}

/// A single indicator's vote on a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Vote {
    Buy,
    Sell,
    Neutral,
}

/// Categorical quality label of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalQuality {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Weak,
    /// Raised a direction but failed the confidence threshold.
    FilteredOut,
    None,
}

impl SignalQuality {
    pub fn label(self) -> &'static str {
        match self {
            SignalQuality::Excellent => "EXCELLENT",
            SignalQuality::VeryGood => "VERY_GOOD",
            SignalQuality::Good => "GOOD",
            SignalQuality::Fair => "FAIR",
            SignalQuality::Weak => "WEAK",
            SignalQuality::FilteredOut => "FILTERED_OUT",
            SignalQuality::None => "NONE",
        }
    }
}

/// Fused decision for one day.
///
/// `candidate` is the direction raised before the confidence filter, so a
/// filtered signal still shows what it would have done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratedSignal {
    pub date: NaiveDate,
    pub direction: SignalDirection,
    pub candidate: SignalDirection,
    pub aggregate_strength: f64,
    pub agreeing_indicators: usize,
    pub buy_votes: usize,
    pub sell_votes: usize,
    pub confidence: f64,
    pub quality: SignalQuality,
}

impl IntegratedSignal {
    /// A day on which nothing was raised.
    pub fn none(date: NaiveDate, aggregate_strength: f64, buy_votes: usize, sell_votes: usize) -> Self {
        Self {
            date,
            direction: SignalDirection::None,
            candidate: SignalDirection::None,
            aggregate_strength,
            agreeing_indicators: 0,
            buy_votes,
            sell_votes,
            confidence: 0.0,
            quality: SignalQuality::None,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.direction == SignalDirection::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.direction == SignalDirection::Sell
    }

    /// True when the signal survived the confidence filter.
    pub fn is_raised(&self) -> bool {
        self.direction != SignalDirection::None
    }

    pub fn is_filtered(&self) -> bool {
        self.quality == SignalQuality::FilteredOut
    }
}
