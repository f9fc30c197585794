//! Property tests for CSV ingest: gaps never fail a load, and a loaded
//! table always runs to a balanced ledger.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use confluence_core::signals::IntegratorConfig;
use confluence_runner::{parse_csv, run_backtest, BacktestConfig, LoadOptions};

/// A numeric cell: a number, or one of the gap spellings.
fn arb_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        6 => (1.0..200.0_f64).prop_map(|v| format!("{v:.2}")),
        1 => Just(String::new()),
        1 => Just("NaN".to_string()),
        1 => Just("n/a".to_string()),
    ]
}

fn arb_row() -> impl Strategy<Value = (String, bool, bool, String)> {
    (arb_cell(), any::<bool>(), any::<bool>(), arb_cell())
}

fn render(rows: &[(String, bool, bool, String)]) -> String {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut out = String::from("date,close,ma_buy_signal,ma_sell_signal,ma_signal_strength\n");
    for (i, (close, buy, sell, strength)) in rows.iter().enumerate() {
        let date = start + Duration::days(i as i64);
        out.push_str(&format!(
            "{date},{close},{},{},{strength}\n",
            u8::from(*buy),
            u8::from(*sell)
        ));
    }
    out
}

proptest! {
    #[test]
    fn gaps_never_fail_and_rows_are_kept(rows in prop::collection::vec(arb_row(), 0..60)) {
        let text = render(&rows);
        let table = parse_csv(text.as_bytes(), &IntegratorConfig::default(), &LoadOptions::default())
            .unwrap();
        prop_assert_eq!(table.bars.len(), rows.len());
        prop_assert_eq!(table.scores.len(), rows.len());
        for row in table.scores.iter() {
            let score = row.score("ma");
            prop_assert!((-1.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn loaded_tables_run_to_balanced_ledgers(rows in prop::collection::vec(arb_row(), 1..60)) {
        let text = render(&rows);
        let table = parse_csv(text.as_bytes(), &IntegratorConfig::default(), &LoadOptions::default())
            .unwrap();
        let mut config = BacktestConfig::default();
        config.signal.min_indicators = 1;
        config.signal.confidence_threshold = 0.0;
        config.signal.weights = [("ma".to_string(), 1.0)].into_iter().collect();

        let result = run_backtest(&config, &table).unwrap();
        let report = result.outcome.report().unwrap();
        prop_assert_eq!(report.portfolio_history.len(), rows.len() + 1);
        for snap in &report.portfolio_history {
            prop_assert!(snap.is_balanced(1e-6 * snap.total_value.abs().max(1.0)));
        }
    }
}
