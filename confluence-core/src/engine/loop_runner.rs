//! Day-by-day loop — the heart of the backtesting engine.
//!
//! Per day, strictly in order:
//! 1. Validate: ascending date, finite positive close
//! 2. Forced exit: with a position open, ask the risk manager
//! 3. Signal: otherwise act on the day's integrated signal
//! 4. Mark-to-market: snapshot cash, shares and total value after trades

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{
    DailyBar, ExitReason, IntegratedSignal, PortfolioSnapshot, Position, RoundTrip, Trade,
    TradeSide,
};
use crate::error::ConfigError;
use crate::metrics::PerformanceMetrics;
use crate::risk::RiskManager;

use super::config::EngineConfig;
use super::cost_model::CostModel;
use super::state::{DayError, LedgerState};
use super::trade_extraction::extract_round_trips;

/// Confidence recorded on sells forced by the risk manager.
const FORCED_EXIT_CONFIDENCE: f64 = 0.5;

/// Everything a completed run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trades: Vec<Trade>,
    pub portfolio_history: Vec<PortfolioSnapshot>,
    pub round_trips: Vec<RoundTrip>,
    pub metrics: PerformanceMetrics,
    pub day_errors: Vec<DayError>,
    /// Position still held at the end of the run, if any.
    pub open_position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BacktestOutcome {
    /// The input series had no days.
    Empty,
    Completed(BacktestReport),
}

impl BacktestOutcome {
    pub fn report(&self) -> Option<&BacktestReport> {
        match self {
            BacktestOutcome::Completed(report) => Some(report),
            BacktestOutcome::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BacktestOutcome::Empty)
    }
}

/// Single-symbol, long-only backtest engine.
///
/// Owns its risk manager, so one engine is one independent run.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: EngineConfig,
    costs: CostModel,
    risk: RiskManager,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let risk = RiskManager::new(config.risk.clone())?;
        Ok(Self {
            costs: CostModel::new(config.slippage_rate, config.commission_rate),
            config,
            risk,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn risk_manager(&self) -> &RiskManager {
        &self.risk
    }

    /// Replay `bars` against `signals` (matched by date).
    ///
    /// A day without a signal is treated as no signal.
    pub fn run(&mut self, bars: &[DailyBar], signals: &[IntegratedSignal]) -> BacktestOutcome {
        let Some(first) = bars.first() else {
            info!("empty series, nothing to backtest");
            return BacktestOutcome::Empty;
        };

        self.risk.reset();
        let by_date: BTreeMap<NaiveDate, &IntegratedSignal> =
            signals.iter().map(|s| (s.date, s)).collect();

        let mut state = LedgerState::new(first.date, self.config.initial_capital);
        let mut history = Vec::with_capacity(bars.len() + 1);
        history.push(state.last_snapshot.clone());
        let mut trades = Vec::new();
        let mut day_errors = Vec::new();

        info!(
            symbol = %self.config.symbol,
            days = bars.len(),
            initial_capital = self.config.initial_capital,
            risk_management = self.config.use_risk_management,
            "backtest started"
        );

        for bar in bars {
            let signal = by_date.get(&bar.date).copied();
            let snapshot = match self.process_day(&mut state, bar, signal, &mut trades) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(date = %err.date(), error = %err, "day skipped, state carried forward");
                    day_errors.push(err);
                    PortfolioSnapshot::carried_forward(bar.date, &state.last_snapshot)
                }
            };
            state.last_snapshot = snapshot.clone();
            history.push(snapshot);
        }

        let round_trips = extract_round_trips(&trades);
        let metrics = PerformanceMetrics::compute(
            &history,
            &trades,
            &round_trips,
            self.config.initial_capital,
            self.config.risk_free_rate,
        );
        let end_date = bars.last().map_or(first.date, |b| b.date);

        info!(
            trades = trades.len(),
            round_trips = round_trips.len(),
            day_errors = day_errors.len(),
            total_return = metrics.total_return,
            final_value = metrics.final_value,
            "backtest completed"
        );

        BacktestOutcome::Completed(BacktestReport {
            start_date: first.date,
            end_date,
            trades,
            portfolio_history: history,
            round_trips,
            metrics,
            day_errors,
            open_position: self.risk.position(&self.config.symbol).cloned(),
        })
    }

    /// Process one day. On error the ledger is untouched.
    pub fn process_day(
        &mut self,
        state: &mut LedgerState,
        bar: &DailyBar,
        signal: Option<&IntegratedSignal>,
        trades: &mut Vec<Trade>,
    ) -> Result<PortfolioSnapshot, DayError> {
        state.admit(bar)?;
        let close = bar.close;

        let mut forced_exit = false;
        if self.config.use_risk_management && state.has_position() {
            let decision = self
                .risk
                .check_exit_conditions(&self.config.symbol, close, bar.date);
            if let Some(reason) = decision.reason {
                trades.push(self.sell(state, bar.date, close, FORCED_EXIT_CONFIDENCE, reason));
                self.risk.close_position(&self.config.symbol);
                forced_exit = true;
            }
        }

        if !forced_exit {
            if let Some(signal) = signal {
                if signal.is_buy() && !state.has_position() {
                    if let Some(trade) = self.buy(state, bar, signal.confidence) {
                        trades.push(trade);
                    }
                } else if signal.is_sell() && state.has_position() {
                    trades.push(self.sell(state, bar.date, close, signal.confidence, ExitReason::Signal));
                    self.risk.close_position(&self.config.symbol);
                }
            }
        }

        Ok(PortfolioSnapshot::mark(
            bar.date,
            state.cash,
            state.shares,
            close,
            &state.last_snapshot,
        ))
    }

    fn buy(&mut self, state: &mut LedgerState, bar: &DailyBar, confidence: f64) -> Option<Trade> {
        let fill_price = self.costs.buy_price(bar.close);
        let volatility = if self.config.use_risk_management {
            bar.usable_volatility().or(self.config.assumed_volatility)
        } else {
            None
        };

        let size = self.risk.calculate_position_size(
            self.costs.investable_cash(state.cash),
            fill_price,
            confidence,
            volatility,
        );
        if size.shares == 0 || size.investment < fill_price {
            debug!(date = %bar.date, cash = state.cash, fill_price, "buy skipped: insufficient capital");
            return None;
        }

        let amount = size.shares as f64 * fill_price;
        let commission = self.costs.commission(amount);
        if amount + commission > state.cash {
            debug!(
                date = %bar.date,
                cost = amount + commission,
                cash = state.cash,
                "buy skipped: insufficient capital"
            );
            return None;
        }

        state.cash -= amount + commission;
        state.shares += size.shares;

        if self.config.use_risk_management {
            self.risk.set_position_stops(
                &self.config.symbol,
                fill_price,
                bar.date,
                size.shares,
                confidence,
                volatility,
            );
        }

        debug!(date = %bar.date, shares = size.shares, fill_price, confidence, "buy executed");
        Some(Trade {
            date: bar.date,
            side: TradeSide::Buy,
            shares: size.shares,
            fill_price,
            amount,
            commission,
            confidence,
            cash_after: state.cash,
            reason: None,
        })
    }

    /// Sell the whole holding.
    fn sell(
        &self,
        state: &mut LedgerState,
        date: NaiveDate,
        close: f64,
        confidence: f64,
        reason: ExitReason,
    ) -> Trade {
        let shares = state.shares;
        let fill_price = self.costs.sell_price(close);
        let amount = shares as f64 * fill_price;
        let commission = self.costs.commission(amount);

        state.cash += amount - commission;
        state.shares = 0;

        debug!(%date, shares, fill_price, reason = reason.label(), "sell executed");
        Trade {
            date,
            side: TradeSide::Sell,
            shares,
            fill_price,
            amount,
            commission,
            confidence,
            cash_after: state.cash,
            reason: Some(reason),
        }
    }
}
