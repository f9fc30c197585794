//! Confluence CLI — run, batch and synthetic-data commands.
//!
//! Commands:
//! - `run` — integrate signals and backtest one CSV table
//! - `batch` — every config against every table, in parallel
//! - `synth` — write a seeded synthetic table

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use confluence_core::engine::BacktestOutcome;
use confluence_runner::synthetic::{write_csv, SyntheticConfig};
use confluence_runner::{
    cross_product, export_batch_json, run_batch, run_from_file, save_artifacts, BacktestConfig,
    BacktestResult,
};

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence CLI — multi-indicator signal integration and risk-managed backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one price + indicator table.
    Run {
        /// CSV with date, close and <id>_signal_strength columns.
        #[arg(long)]
        data: PathBuf,

        /// TOML config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overrides [backtest].symbol.
        #[arg(long)]
        symbol: Option<String>,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: Option<String>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run every config against every data file in parallel.
    Batch {
        /// Data files.
        #[arg(long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,

        /// Config files. Defaults apply when omitted.
        #[arg(long, num_args = 1..)]
        config: Vec<PathBuf>,

        /// Write the batch JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a seeded synthetic table.
    Synth {
        #[arg(long, default_value_t = 500)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            config,
            symbol,
            start,
            end,
            output_dir,
        } => run_cmd(data, config, symbol, start, end, output_dir),
        Commands::Batch {
            data,
            config,
            output,
        } => batch_cmd(data, config, output),
        Commands::Synth {
            days,
            seed,
            start,
            out,
        } => synth_cmd(days, seed, start, out),
    }
}

fn run_cmd(
    data: PathBuf,
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    start: Option<String>,
    end: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    if let Some(symbol) = symbol {
        config.backtest.symbol = symbol;
    }
    if let Some(start) = parse_date(start.as_deref())? {
        config.backtest.start_date = Some(start);
    }
    if let Some(end) = parse_date(end.as_deref())? {
        config.backtest.end_date = Some(end);
    }

    let result = run_from_file(&config, &data)
        .with_context(|| format!("backtest failed for {}", data.display()))?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn batch_cmd(data: Vec<PathBuf>, config_paths: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let configs = if config_paths.is_empty() {
        vec![BacktestConfig::default()]
    } else {
        config_paths
            .iter()
            .map(|p| load_config(Some(p)))
            .collect::<Result<Vec<_>>>()?
    };

    let jobs = cross_product(&configs, &data);
    let entries = run_batch(&jobs);
    let json = export_batch_json(&entries)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "batch results written");
        }
        None => println!("{json}"),
    }

    let failed = entries.iter().filter(|e| e.error().is_some()).count();
    if failed > 0 {
        bail!("{failed} of {} batch jobs failed", entries.len());
    }
    Ok(())
}

fn synth_cmd(days: usize, seed: u64, start: Option<String>, out: PathBuf) -> Result<()> {
    let mut config = SyntheticConfig {
        days,
        seed,
        ..SyntheticConfig::default()
    };
    if let Some(start) = parse_date(start.as_deref())? {
        config.start_date = start;
    }
    write_csv(&config, &out).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {days} synthetic days (seed {seed}) to {}", out.display());
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(p) => BacktestConfig::load(p).with_context(|| format!("invalid config {}", p.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date '{s}'")))
        .transpose()
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Run ID:         {}", result.run_id);

    let report = match &result.outcome {
        BacktestOutcome::Empty => {
            println!("No data to simulate.");
            return;
        }
        BacktestOutcome::Completed(report) => report,
    };
    let m = &report.metrics;
    let s = &result.signal_summary;

    println!("Period:         {} to {}", report.start_date, report.end_date);
    println!(
        "Signals:        {} buy / {} sell / {} filtered",
        s.buy_signals, s.sell_signals, s.filtered_signals
    );
    println!(
        "Trades:         {} ({} round trips)",
        m.total_trades, m.round_trips
    );
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.0}", m.final_value);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Annualized:     {:.2}%", m.annualized_return * 100.0);
    println!("Volatility:     {:.2}%", m.volatility * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Commission:     {:.0}", m.total_commission);
    for err in &report.day_errors {
        println!("WARNING: {err}");
    }
    if let Some(position) = &report.open_position {
        println!(
            "Open position:  {} shares @ {:.2} (stop {:.2}, target {:.2})",
            position.shares,
            position.entry_price,
            position.stop_loss_price,
            position.take_profit_price
        );
    }
}
