//! Seeded synthetic tables for development and tests.
//!
//! Prices follow a random walk; each indicator votes on its own momentum
//! window with a little noise, so raised signals cluster around trends the
//! way real feeds do. Same seed, same table.

use std::io::Write;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use confluence_core::domain::{DailyBar, IndicatorScore, ScoreRow, ScoreTable};
use confluence_core::signals::IntegratorConfig;

use crate::data_loader::{parse_csv, LoadError, LoadOptions, LoadedTable};

/// (indicator id, momentum lookback in bars, max strength)
const INDICATORS: [(&str, usize, f64); 5] = [
    ("ma", 10, 3.0),
    ("rsi", 5, 2.0),
    ("macd", 12, 3.0),
    ("bb", 20, 3.0),
    ("volume", 3, 3.0),
];

/// Momentum per strength point.
const STRENGTH_STEP: f64 = 0.02;
const VOLATILITY_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub days: usize,
    pub seed: u64,
    pub start_date: NaiveDate,
    pub start_price: f64,
    /// Mean daily return.
    pub drift: f64,
    /// Half-width of the uniform daily return shock.
    pub shock: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            days: 500,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap_or_default(),
            start_price: 50_000.0,
            drift: 0.0003,
            shock: 0.025,
        }
    }
}

/// Generate `config.days` weekday bars with five indicator feeds.
pub fn generate(config: &SyntheticConfig) -> (Vec<DailyBar>, ScoreTable) {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut bars: Vec<DailyBar> = Vec::with_capacity(config.days);
    let mut rows = Vec::with_capacity(config.days);
    let mut returns: Vec<f64> = Vec::with_capacity(config.days);
    let mut price = config.start_price;
    let mut date = config.start_date;

    while bars.len() < config.days {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
            continue;
        }

        let ret = config.drift + rng.gen_range(-config.shock..=config.shock);
        let open = price;
        let close = round_cents(price * (1.0 + ret));
        let high = round_cents(open.max(close) * (1.0 + rng.gen_range(0.0..0.01)));
        let low = round_cents(open.min(close) * (1.0 - rng.gen_range(0.0..0.01)));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;
        returns.push(ret);

        let volatility = (returns.len() >= VOLATILITY_WINDOW)
            .then(|| annualized_std(&returns[returns.len() - VOLATILITY_WINDOW..]));

        bars.push(DailyBar {
            date,
            open: round_cents(open),
            high,
            low,
            close,
            volume,
            volatility,
        });

        let mut row = ScoreRow::new(date);
        for (id, lookback, max) in INDICATORS {
            let momentum = momentum(&bars, lookback) + rng.gen_range(-0.01..0.01);
            let strength = (momentum / STRENGTH_STEP).trunc().clamp(-max, max);
            let buy = strength >= 1.0;
            let sell = strength <= -1.0;
            row.insert(IndicatorScore::from_flags(id, date, buy, sell, strength, max));
        }
        rows.push(row);

        price = close;
        date += Duration::days(1);
    }

    (bars, ScoreTable::new(rows))
}

/// Render the table in the loader's CSV layout.
pub fn to_csv<W: Write>(bars: &[DailyBar], scores: &ScoreTable, writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![
        "date".to_string(),
        "open".into(),
        "high".into(),
        "low".into(),
        "close".into(),
        "volume".into(),
        "volatility".into(),
    ];
    for (id, _, _) in INDICATORS {
        header.push(format!("{id}_buy_signal"));
        header.push(format!("{id}_sell_signal"));
        header.push(format!("{id}_signal_strength"));
    }
    wtr.write_record(&header)?;

    for (bar, row) in bars.iter().zip(scores.rows()) {
        let mut record = vec![
            bar.date.to_string(),
            format!("{:.2}", bar.open),
            format!("{:.2}", bar.high),
            format!("{:.2}", bar.low),
            format!("{:.2}", bar.close),
            format!("{:.0}", bar.volume),
            bar.volatility.map(|v| format!("{v:.6}")).unwrap_or_default(),
        ];
        for (id, _, _) in INDICATORS {
            let (buy, sell, strength) = row
                .scores
                .get(id)
                .map_or((false, false, 0.0), |s| (s.buy_flag, s.sell_flag, s.strength));
            record.push(u8::from(buy).to_string());
            record.push(u8::from(sell).to_string());
            record.push(format!("{strength:.0}"));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Generate and write a CSV file.
pub fn write_csv(config: &SyntheticConfig, path: &Path) -> Result<(), LoadError> {
    let (bars, scores) = generate(config);
    let file = std::fs::File::create(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    to_csv(&bars, &scores, std::io::BufWriter::new(file))?;
    Ok(())
}

/// Generate a table and pass it through the CSV loader, so the result is
/// exactly what a run over the written file would see.
pub fn generate_table(
    config: &SyntheticConfig,
    integrator: &IntegratorConfig,
) -> Result<LoadedTable, LoadError> {
    let (bars, scores) = generate(config);
    let mut buf = Vec::new();
    to_csv(&bars, &scores, &mut buf)?;
    parse_csv(buf.as_slice(), integrator, &LoadOptions::default())
}

fn momentum(bars: &[DailyBar], lookback: usize) -> f64 {
    let n = bars.len();
    if n <= lookback {
        return 0.0;
    }
    let now = bars[n - 1].close;
    let then = bars[n - 1 - lookback].close;
    if then > 0.0 {
        now / then - 1.0
    } else {
        0.0
    }
}

fn annualized_std(returns: &[f64]) -> f64 {
    let n = returns.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt() * 252.0_f64.sqrt()
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(seed: u64) -> SyntheticConfig {
        SyntheticConfig {
            days: 60,
            seed,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn same_seed_same_table() {
        assert_eq!(generate(&small(7)), generate(&small(7)));
        assert_ne!(generate(&small(7)).0, generate(&small(8)).0);
    }

    #[test]
    fn weekdays_only_and_ascending() {
        let (bars, scores) = generate(&small(1));
        assert_eq!(bars.len(), 60);
        assert_eq!(scores.len(), 60);
        for pair in bars.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        assert!(bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(bars.iter().all(|b| b.is_sane()));
    }

    #[test]
    fn volatility_appears_after_window() {
        let (bars, _) = generate(&small(3));
        assert!(bars[VOLATILITY_WINDOW - 2].volatility.is_none());
        assert!(bars[VOLATILITY_WINDOW - 1].volatility.is_some());
    }

    #[test]
    fn csv_reloads_with_all_indicators() {
        let table = generate_table(&small(5), &IntegratorConfig::default()).unwrap();
        assert_eq!(table.bars.len(), 60);
        assert_eq!(table.indicator_ids, vec!["ma", "rsi", "macd", "bb", "volume"]);
        assert_eq!(table.gaps, 0);
    }

    #[test]
    fn flags_agree_with_strength_sign() {
        let (_, scores) = generate(&small(11));
        for row in scores.iter() {
            for score in row.scores.values() {
                assert!(!(score.buy_flag && score.sell_flag));
                if score.buy_flag {
                    assert!(score.strength >= 1.0);
                }
                if score.sell_flag {
                    assert!(score.strength <= -1.0);
                }
            }
        }
    }
}
