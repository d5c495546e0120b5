use crate::fill::FillSimulator;
use crate::report::{self, ReportMetrics};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use senti_trade_core::{
    AppConfig, Direction, EntryFill, EquityPoint, ExitReason, MarketDataError, OrderIntent,
    Portfolio, Position, PriceBar, SignalDirection, Timeframe, Trade,
};
use senti_trade_data::{MarketData, SentimentFeed};
use senti_trade_indicators::IndicatorEngine;
use senti_trade_risk::{RejectReason, RiskDecision, RiskManager};
use senti_trade_signals::SignalFusion;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    /// The run stopped early (data fault, exhausted capital). Everything
    /// accumulated up to the fault is preserved on the result.
    Failed,
}

/// Lifecycle of a run, observable while it is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// A trade the risk manager refused during the run, with its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub timestamp: DateTime<Utc>,
    pub reason: RejectReason,
}

/// Everything a run produced. A failed run is still a value: partial
/// trades, equity curve, and rejections survive, with `error` saying what
/// stopped it. Metrics are computed only for completed runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: Decimal,
    pub status: RunStatus,
    pub error: Option<String>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub rejections: Vec<RejectionRecord>,
    pub metrics: Option<ReportMetrics>,
}

/// Deterministic bar-replay simulator.
///
/// Bars are consumed strictly in order and every decision at bar *t* sees
/// only bars up to *t* and sentiment stamped at or before *t*. Two runs
/// over the same inputs and configuration produce identical results.
pub struct Backtester {
    market: Arc<dyn MarketData>,
    sentiment: Arc<dyn SentimentFeed>,
    config: AppConfig,
    state: tokio::sync::watch::Sender<RunState>,
}

impl Backtester {
    #[must_use]
    pub fn new(
        market: Arc<dyn MarketData>,
        sentiment: Arc<dyn SentimentFeed>,
        config: AppConfig,
    ) -> Self {
        let (state, _) = tokio::sync::watch::channel(RunState::Idle);
        Self {
            market,
            sentiment,
            config,
            state,
        }
    }

    /// Current lifecycle state: `Idle` until the first run, `Running`
    /// while a replay is in flight, then the last run's terminal state.
    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch-channel view of the lifecycle for concurrent observers.
    #[must_use]
    pub fn state_watch(&self) -> tokio::sync::watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Replays `[start, end]` for one symbol. Never returns `Err`: faults
    /// surface as a `Failed` result carrying whatever was simulated before
    /// the fault.
    pub async fn run(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BacktestResult {
        let initial_capital = self.config.backtest.initial_capital;
        let mut portfolio = Portfolio::new(initial_capital);
        let mut rejections = Vec::new();

        tracing::info!(symbol, %timeframe, %start, %end, "backtest started");
        self.state.send_replace(RunState::Running);
        let outcome = self
            .replay(symbol, timeframe, start, end, &mut portfolio, &mut rejections)
            .await;

        let (status, error) = match outcome {
            Ok(()) => {
                self.state.send_replace(RunState::Completed);
                (RunStatus::Completed, None)
            }
            Err(e) => {
                tracing::error!(symbol, error = %e, "backtest failed");
                self.state.send_replace(RunState::Failed);
                (RunStatus::Failed, Some(format!("{e:#}")))
            }
        };

        let mut result = BacktestResult {
            symbol: symbol.to_string(),
            timeframe,
            start,
            end,
            initial_capital,
            status,
            error,
            trades: portfolio.trades().to_vec(),
            equity_curve: portfolio.equity_curve().to_vec(),
            rejections,
            metrics: None,
        };
        if result.status == RunStatus::Completed {
            result.metrics = Some(report::generate(&result));
            tracing::info!(
                symbol,
                trades = result.trades.len(),
                rejections = result.rejections.len(),
                "backtest completed"
            );
        }
        result
    }

    async fn replay(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        portfolio: &mut Portfolio,
        rejections: &mut Vec<RejectionRecord>,
    ) -> Result<()> {
        let risk = RiskManager::new(&self.config.risk)?;
        let fills = FillSimulator::new(&self.config.backtest)?;
        let fusion = SignalFusion::new(self.config.fusion.clone());
        let mut indicators = IndicatorEngine::new(&self.config.indicators);

        let bars = self.market.get_bars(symbol, timeframe, start, end).await?;
        if bars.is_empty() {
            anyhow::bail!("no bars for {symbol} {timeframe} in [{start}, {end}]");
        }

        let step_secs = timeframe.duration().num_seconds();
        let tolerance = i64::from(self.config.backtest.max_gap_intervals);
        let mut prev: Option<DateTime<Utc>> = None;
        let mut pending: Option<OrderIntent> = None;

        for (i, bar) in bars.iter().enumerate() {
            let is_last = i + 1 == bars.len();

            if let Some(previous) = prev {
                check_continuity(symbol, previous, bar.timestamp, step_secs, tolerance)?;
            }
            prev = Some(bar.timestamp);

            // A deferred entry from the previous bar fills at this open.
            if let Some(intent) = pending.take() {
                let fill_price = fills.entry(bar.open, intent.direction);
                portfolio.open_position(Position::from_intent(&intent, fill_price, bar.timestamp))?;
            }

            let triggered = portfolio
                .position(symbol)
                .and_then(|p| exit_trigger(p, bar).map(|(price, reason)| (p.direction, price, reason)));
            if let Some((direction, trigger, reason)) = triggered {
                let fill_price = fills.exit(trigger, direction);
                let trade = portfolio.close_position(symbol, fill_price, reason, bar.timestamp)?;
                tracing::debug!(symbol, pnl = %trade.pnl, ?reason, "position closed");
            }

            let snapshot = indicators.on_bar(bar);

            if !is_last && portfolio.position(symbol).is_none() && pending.is_none() {
                let sentiment = self.sentiment.get_sentiment(symbol, bar.timestamp).await?;
                let signal = fusion.fuse(symbol, &snapshot, sentiment.as_ref());
                if signal.direction != SignalDirection::Flat {
                    let atr = snapshot
                        .atr
                        .and_then(|a| Decimal::try_from(a).ok())
                        .filter(|a| *a > Decimal::ZERO);
                    match risk.evaluate(&signal, bar.close, atr, portfolio) {
                        RiskDecision::Approved(intent) => match self.config.backtest.entry_fill {
                            EntryFill::Close => {
                                let fill_price = fills.entry(bar.close, intent.direction);
                                portfolio.open_position(Position::from_intent(
                                    &intent,
                                    fill_price,
                                    bar.timestamp,
                                ))?;
                            }
                            EntryFill::NextOpen => pending = Some(intent),
                        },
                        RiskDecision::Rejected {
                            timestamp, reason, ..
                        } => {
                            rejections.push(RejectionRecord { timestamp, reason });
                        }
                    }
                }
            }

            // A position still open on the final bar is flattened there.
            if is_last {
                if let Some(direction) = portfolio.position(symbol).map(|p| p.direction) {
                    let fill_price = fills.exit(bar.close, direction);
                    portfolio.close_position(
                        symbol,
                        fill_price,
                        ExitReason::EndOfData,
                        bar.timestamp,
                    )?;
                }
            }

            let equity = portfolio.equity_at(symbol, bar.close);
            portfolio.record_equity(bar.timestamp, equity);
        }

        Ok(())
    }
}

/// Fails the replay on non-increasing timestamps or a gap wider than the
/// configured tolerance.
fn check_continuity(
    symbol: &str,
    previous: DateTime<Utc>,
    current: DateTime<Utc>,
    step_secs: i64,
    tolerance: i64,
) -> Result<(), MarketDataError> {
    if current == previous {
        return Err(MarketDataError::DuplicateBar {
            symbol: symbol.to_string(),
            timestamp: current,
        });
    }
    if current < previous {
        return Err(MarketDataError::OutOfOrder {
            symbol: symbol.to_string(),
            previous,
            current,
        });
    }
    let missing = (current - previous).num_seconds() / step_secs - 1;
    if missing > tolerance {
        return Err(MarketDataError::Gap {
            symbol: symbol.to_string(),
            after: previous,
            gap_bars: u32::try_from(missing).unwrap_or(u32::MAX),
            tolerance: u32::try_from(tolerance).unwrap_or(0),
        });
    }
    Ok(())
}

/// Whether the bar's range touched the position's stop or take-profit, and
/// the triggered exit. When one bar spans both levels the stop wins: the
/// intrabar path is unknown, so the simulator assumes the worse one.
fn exit_trigger(position: &Position, bar: &PriceBar) -> Option<(Decimal, ExitReason)> {
    match position.direction {
        Direction::Long => {
            if bar.low <= position.stop_loss {
                Some((position.stop_loss, ExitReason::StopLoss))
            } else if bar.high >= position.take_profit {
                Some((position.take_profit, ExitReason::TakeProfit))
            } else {
                None
            }
        }
        Direction::Short => {
            if bar.high >= position.stop_loss {
                Some((position.stop_loss, ExitReason::StopLoss))
            } else if bar.low <= position.take_profit {
                Some((position.take_profit, ExitReason::TakeProfit))
            } else {
                None
            }
        }
    }
}
