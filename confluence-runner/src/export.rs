//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape and portfolio history for external tools
//! - **Markdown**: human-readable single-run report
//!
//! Persisted results carry a `schema_version`; newer versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use confluence_core::domain::{PortfolioSnapshot, Trade};
use confluence_core::engine::BacktestOutcome;

use crate::batch::BatchEntry;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

pub fn export_batch_json(entries: &[BatchEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries).context("failed to serialize batch results to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: date, side, shares, fill_price, amount, commission, confidence,
/// cash_after, reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "side",
        "shares",
        "fill_price",
        "amount",
        "commission",
        "confidence",
        "cash_after",
        "reason",
    ])?;

    for t in trades {
        let side = if t.is_buy() { "BUY" } else { "SELL" };
        wtr.write_record([
            t.date.to_string(),
            side.to_string(),
            t.shares.to_string(),
            format!("{:.4}", t.fill_price),
            format!("{:.2}", t.amount),
            format!("{:.2}", t.commission),
            format!("{:.4}", t.confidence),
            format!("{:.2}", t.cash_after),
            t.reason.map_or("", |r| r.label()).to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per snapshot, baseline included.
pub fn export_equity_csv(history: &[PortfolioSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "cash",
        "shares",
        "mark_price",
        "stock_value",
        "total_value",
        "period_return",
        "cumulative_return",
    ])?;
    for s in history {
        wtr.write_record([
            &s.date.to_string(),
            &format!("{:.2}", s.cash),
            &s.shares.to_string(),
            &format!("{:.4}", s.mark_price),
            &format!("{:.2}", s.stock_value),
            &format!("{:.2}", s.total_value),
            &format!("{:.8}", s.period_return),
            &format!("{:.8}", s.cumulative_return),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one run under `{symbol}_{run_id[..12]}/`:
/// - `manifest.json` — the full `BacktestResult`
/// - `trades.csv`, `equity.csv` — only for completed runs
/// - `report.md`
///
/// Returns the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id = result.run_id.get(..12).unwrap_or(&result.run_id);
    let run_dir = output_dir.join(format!("{}_{}", result.symbol, short_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("manifest.json"), &export_json(result)?)?;
    if let Some(report) = result.outcome.report() {
        write(&run_dir.join("trades.csv"), &export_trades_csv(&report.trades)?)?;
        write(
            &run_dir.join("equity.csv"),
            &export_equity_csv(&report.portfolio_history)?,
        )?;
    }
    write(&run_dir.join("report.md"), &generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push_str(&format!("| Initial Capital | {:.0} |\n", result.initial_capital()));

    let report = match &result.outcome {
        BacktestOutcome::Empty => {
            md.push_str("\nNo data to simulate.\n");
            return md;
        }
        BacktestOutcome::Completed(report) => report,
    };
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        report.start_date, report.end_date
    ));
    md.push('\n');

    let m = &report.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Value | {:.0} |\n", m.final_value));
    md.push_str(&format!("| Profit / Loss | {:.0} |\n", m.profit_loss));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!(
        "| Annualized Return | {:.2}% |\n",
        m.annualized_return * 100.0
    ));
    md.push_str(&format!("| Volatility | {:.2}% |\n", m.volatility * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!(
        "| Trades | {} ({} buy / {} sell) |\n",
        m.total_trades, m.buy_trades, m.sell_trades
    ));
    md.push_str(&format!("| Commission | {:.0} |\n", m.total_commission));
    md.push('\n');

    let s = &result.signal_summary;
    md.push_str("## Signals\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Days | {} |\n", s.days));
    md.push_str(&format!("| Buy | {} |\n", s.buy_signals));
    md.push_str(&format!("| Sell | {} |\n", s.sell_signals));
    md.push_str(&format!("| Filtered | {} |\n", s.filtered_signals));
    md.push_str(&format!(
        "| Average Confidence | {:.3} |\n",
        s.average_confidence
    ));
    for (label, count) in &s.quality_counts {
        md.push_str(&format!("| {label} | {count} |\n"));
    }
    md.push('\n');

    let forced: Vec<_> = report
        .round_trips
        .iter()
        .filter_map(|rt| rt.exit_reason.filter(|r| r.is_forced()))
        .collect();
    if !forced.is_empty() {
        md.push_str("## Forced Exits\n\n");
        for reason in confluence_core::domain::ExitReason::FORCED {
            let n = forced.iter().filter(|r| **r == reason).count();
            if n > 0 {
                md.push_str(&format!("- {}: {n}\n", reason.label()));
            }
        }
        md.push('\n');
    }

    if !report.day_errors.is_empty() {
        md.push_str("## Data Quality\n\n");
        for err in &report.day_errors {
            md.push_str(&format!("- {err}\n"));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_core::domain::ExitReason;
    use crate::config::BacktestConfig;
    use crate::runner::run_backtest;
    use crate::synthetic::{generate_table, SyntheticConfig};

    fn sample_result() -> BacktestResult {
        let config = BacktestConfig::default().with_symbol("SYN");
        let synth = SyntheticConfig {
            days: 200,
            seed: 17,
            ..SyntheticConfig::default()
        };
        let table = generate_table(&synth, &config.signal).unwrap();
        run_backtest(&config, &table).unwrap()
    }

    #[test]
    fn json_roundtrip() {
        let original = sample_result();
        let json = export_json(&original).unwrap();
        let restored = import_json(&json).unwrap();
        assert_eq!(restored.run_id, original.run_id);
        assert_eq!(restored.config, original.config);
        assert_eq!(
            restored.outcome.report().unwrap().trades,
            original.outcome.report().unwrap().trades
        );
    }

    #[test]
    fn json_roundtrip_is_exact_for_every_float() {
        let original = sample_result();
        let restored = import_json(&export_json(&original).unwrap()).unwrap();
        assert_eq!(restored, original);

        let awkward: f64 = 7_888_462.992_409_999_5;
        let json = serde_json::to_string(&awkward).unwrap();
        let back: f64 = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_bits(), awkward.to_bits());
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut result = sample_result();
        result.schema_version = 99;
        let json = export_json(&result).unwrap();
        let msg = import_json(&json).unwrap_err().to_string();
        assert!(msg.contains("unsupported schema version 99"));
    }

    #[test]
    fn trades_csv_has_one_row_per_fill() {
        let result = sample_result();
        let trades = &result.outcome.report().unwrap().trades;
        let csv = export_trades_csv(trades).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,side,shares,fill_price,amount,commission,confidence,cash_after,reason"
        );
        assert_eq!(lines.count(), trades.len());
    }

    #[test]
    fn trades_csv_rows_carry_side_and_reason() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let buy = Trade {
            date,
            side: confluence_core::domain::TradeSide::Buy,
            shares: 119,
            fill_price: 70_070.0,
            amount: 8_338_330.0,
            commission: 25_014.99,
            confidence: 0.7,
            cash_after: 1_636_655.01,
            reason: None,
        };
        let stop = Trade {
            side: confluence_core::domain::TradeSide::Sell,
            fill_price: 60_939.0,
            reason: Some(ExitReason::StopLoss),
            ..buy.clone()
        };
        let csv = export_trades_csv(&[buy, stop]).unwrap();
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(
            rows[0],
            "2024-01-05,BUY,119,70070.0000,8338330.00,25014.99,0.7000,1636655.01,"
        );
        assert!(rows[1].starts_with("2024-01-05,SELL,119,60939.0000,"));
        assert!(rows[1].ends_with(",STOP_LOSS"));
    }

    #[test]
    fn equity_csv_includes_baseline() {
        let result = sample_result();
        let history = &result.outcome.report().unwrap().portfolio_history;
        let csv = export_equity_csv(history).unwrap();
        assert_eq!(csv.lines().count(), history.len() + 1);
        assert!(csv.lines().nth(1).unwrap().contains("10000000.00"));
    }

    #[test]
    fn report_has_sections() {
        let md = generate_report(&sample_result());
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains("## Performance Summary"));
        assert!(md.contains("## Signals"));
        assert!(md.contains("| Symbol | SYN |"));
    }
}
