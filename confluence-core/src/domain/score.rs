//! Indicator scores — the externally produced per-indicator input table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map a feed signal strength onto `[-1, 1]`.
///
/// Non-finite strengths and non-positive maxima are data gaps and map to 0.
pub fn normalize(strength: f64, max_strength: f64) -> f64 {
    if !strength.is_finite() || !max_strength.is_finite() || max_strength <= 0.0 {
        return 0.0;
    }
    (strength / max_strength).clamp(-1.0, 1.0)
}

/// One indicator's reading on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorScore {
    pub indicator_id: String,
    pub date: NaiveDate,
    /// Normalized score in `[-1, 1]`. Positive is bullish.
    pub raw_score: f64,
    pub buy_flag: bool,
    pub sell_flag: bool,
    /// Signed feed strength. Sell readings carry a negative strength.
    pub strength: f64,
}

impl IndicatorScore {
    /// Build a score from the feed's buy/sell flags and strength.
    ///
    /// The score is only non-zero when one of the flags is raised.
    pub fn from_flags(
        indicator_id: impl Into<String>,
        date: NaiveDate,
        buy_flag: bool,
        sell_flag: bool,
        strength: f64,
        max_strength: f64,
    ) -> Self {
        let raw_score = if buy_flag || sell_flag {
            normalize(strength, max_strength)
        } else {
            0.0
        };
        Self {
            indicator_id: indicator_id.into(),
            date,
            raw_score,
            buy_flag,
            sell_flag,
            strength,
        }
    }

    /// A reading with no opinion.
    pub fn neutral(indicator_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            indicator_id: indicator_id.into(),
            date,
            raw_score: 0.0,
            buy_flag: false,
            sell_flag: false,
            strength: 0.0,
        }
    }

    /// Score with NaN treated as neutral.
    pub fn score(&self) -> f64 {
        if self.raw_score.is_finite() {
            self.raw_score.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

/// All indicator readings for one day, keyed by indicator id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub date: NaiveDate,
    pub scores: BTreeMap<String, IndicatorScore>,
}

impl ScoreRow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            scores: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, score: IndicatorScore) {
        self.scores.insert(score.indicator_id.clone(), score);
    }

    pub fn with(mut self, score: IndicatorScore) -> Self {
        self.insert(score);
        self
    }

    /// Score for `indicator_id`; missing indicators contribute 0.
    pub fn score(&self, indicator_id: &str) -> f64 {
        self.scores.get(indicator_id).map_or(0.0, IndicatorScore::score)
    }
}

/// Dated rows of indicator readings, ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    rows: Vec<ScoreRow>,
}

impl ScoreTable {
    /// Build a table, sorting rows ascending by date.
    pub fn new(mut rows: Vec<ScoreRow>) -> Self {
        rows.sort_by_key(|r| r.date);
        Self { rows }
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreRow> {
        self.rows.iter()
    }

    /// Every indicator id that appears in at least one row.
    pub fn indicator_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .rows
            .iter()
            .flat_map(|r| r.scores.keys().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
