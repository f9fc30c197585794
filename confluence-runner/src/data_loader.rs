//! CSV ingest for the combined price + indicator table.
//!
//! Expected columns: `date,open,high,low,close,volume` with an optional
//! `volatility`, plus one `<id>_buy_signal,<id>_sell_signal,<id>_signal_strength`
//! triple per indicator. Indicators are discovered from the
//! `_signal_strength` suffix.
//!
//! Empty, `NaN` or unparsable numeric cells are data gaps: a missing close
//! becomes a NaN price (the engine carries that day forward) and a missing
//! strength becomes a neutral score. Only structural problems fail the load.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use thiserror::Error;
use tracing::{debug, warn};

use confluence_core::domain::{DailyBar, IndicatorScore, ScoreRow, ScoreTable};
use confluence_core::signals::IntegratorConfig;

const STRENGTH_SUFFIX: &str = "_signal_strength";
const BUY_SUFFIX: &str = "_buy_signal";
const SELL_SUFFIX: &str = "_sell_signal";

/// Strength scale for indicators the integrator config doesn't know.
pub const DEFAULT_MAX_STRENGTH: f64 = 3.0;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: unparsable date '{value}'")]
    BadDate { row: usize, value: String },
}

/// Optional inclusive date window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadOptions {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl LoadOptions {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| date >= s) && self.end_date.map_or(true, |e| date <= e)
    }
}

/// Bars and indicator scores for one symbol, sorted ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub bars: Vec<DailyBar>,
    pub scores: ScoreTable,
    pub indicator_ids: Vec<String>,
    /// BLAKE3 over the raw input bytes.
    pub dataset_hash: String,
    /// Rows in the source before date filtering.
    pub total_rows: usize,
    /// Numeric cells treated as gaps.
    pub gaps: usize,
}

impl LoadedTable {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
    volatility: Option<usize>,
    indicators: Vec<IndicatorColumns>,
}

struct IndicatorColumns {
    id: String,
    max_strength: f64,
    buy: Option<usize>,
    sell: Option<usize>,
    strength: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord, config: &IntegratorConfig) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        let mut indicators = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            // ids are lowercased so headers match configured ids in any case
            let header = header.to_ascii_lowercase();
            let Some(id) = header.strip_suffix(STRENGTH_SUFFIX) else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            let max_strength = config
                .indicator(id)
                .map_or(DEFAULT_MAX_STRENGTH, |spec| spec.max_strength);
            indicators.push(IndicatorColumns {
                id: id.to_string(),
                max_strength,
                buy: find(&format!("{id}{BUY_SUFFIX}")),
                sell: find(&format!("{id}{SELL_SUFFIX}")),
                strength: i,
            });
        }

        Ok(Self {
            date: find("date").ok_or(LoadError::MissingColumn("date"))?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close: find("close").ok_or(LoadError::MissingColumn("close"))?,
            volume: find("volume"),
            volatility: find("volatility"),
            indicators,
        })
    }
}

/// Load a CSV file from disk.
pub fn load_csv(
    path: &Path,
    config: &IntegratorConfig,
    opts: &LoadOptions,
) -> Result<LoadedTable, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "loading table");
    parse_csv(bytes.as_slice(), config, opts)
}

/// Parse CSV from any reader. The dataset hash covers every byte read.
pub fn parse_csv<R: Read>(
    mut reader: R,
    config: &IntegratorConfig,
    opts: &LoadOptions,
) -> Result<LoadedTable, LoadError> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).map_err(|source| LoadError::Io {
        path: "<reader>".to_string(),
        source,
    })?;
    let dataset_hash = blake3::hash(&raw).to_hex().to_string();

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(raw.as_slice());
    let columns = Columns::from_headers(rdr.headers()?, config)?;

    let mut rows: Vec<(DailyBar, ScoreRow)> = Vec::new();
    let mut total_rows = 0;
    let mut gaps = 0;

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        total_rows += 1;
        let date_cell = record.get(columns.date).unwrap_or("");
        let date = parse_date(date_cell).ok_or_else(|| LoadError::BadDate {
            row: i + 1,
            value: date_cell.to_string(),
        })?;
        if !opts.contains(date) {
            continue;
        }

        let mut cell = |idx: Option<usize>| -> Option<f64> {
            let idx = idx?;
            let value = number(record.get(idx));
            if value.is_none() {
                gaps += 1;
            }
            value
        };

        let close = cell(Some(columns.close)).unwrap_or(f64::NAN);
        let bar = DailyBar {
            date,
            open: cell(columns.open).unwrap_or(close),
            high: cell(columns.high).unwrap_or(close),
            low: cell(columns.low).unwrap_or(close),
            close,
            volume: cell(columns.volume).unwrap_or(0.0),
            volatility: columns.volatility.and_then(|idx| number(record.get(idx))),
        };

        let mut row = ScoreRow::new(date);
        for ind in &columns.indicators {
            let buy = ind.buy.map_or(false, |idx| flag(record.get(idx)));
            let sell = ind.sell.map_or(false, |idx| flag(record.get(idx)));
            let score = match cell(Some(ind.strength)) {
                Some(strength) => {
                    IndicatorScore::from_flags(&ind.id, date, buy, sell, strength, ind.max_strength)
                }
                None => IndicatorScore::neutral(&ind.id, date),
            };
            row.insert(score);
        }
        rows.push((bar, row));
    }

    rows.sort_by_key(|(bar, _)| bar.date);
    let (bars, score_rows): (Vec<_>, Vec<_>) = rows.into_iter().unzip();

    if gaps > 0 {
        warn!(gaps, "numeric gaps in input treated as missing data");
    }
    debug!(
        rows = bars.len(),
        total_rows,
        indicators = columns.indicators.len(),
        "table loaded"
    );

    Ok(LoadedTable {
        bars,
        scores: ScoreTable::new(score_rows),
        indicator_ids: columns.indicators.into_iter().map(|c| c.id).collect(),
        dataset_hash,
        total_rows,
        gaps,
    })
}

/// `YYYY-MM-DD`, optionally followed by a time component.
fn parse_date(cell: &str) -> Option<NaiveDate> {
    let head = cell.get(..10).unwrap_or(cell);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Finite number, or `None` for a gap.
fn number(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// `1`, `1.0`, `true`, `True` are raised flags; anything else is not.
fn flag(cell: Option<&str>) -> bool {
    match cell {
        Some(s) if s.eq_ignore_ascii_case("true") => true,
        Some(s) => s.parse::<f64>().map_or(false, |v| v.is_finite() && v != 0.0),
        None => false,
    }
}
