use crate::commands::{WorkerCommand, WorkerState, WorkerStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use senti_trade_core::{
    Direction, ExitReason, LiveConfig, Portfolio, Position, Signal, SignalDirection, Timeframe,
};
use senti_trade_data::with_retry;
use senti_trade_risk::{RiskDecision, RiskManager};
use senti_trade_signals::{Observation, SignalEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// One polling actor per symbol.
///
/// Owns its indicator state through the signal engine (nothing is shared
/// across symbols) and shares only the book-wide portfolio, which it locks
/// across the risk check and the open so exposure headroom cannot be
/// double-spent by two workers deciding at once.
pub struct SymbolWorker {
    symbol: String,
    timeframe: Timeframe,
    engine: Arc<SignalEngine>,
    risk: Arc<RiskManager>,
    portfolio: Arc<Mutex<Portfolio>>,
    live: LiveConfig,
    rx: mpsc::Receiver<WorkerCommand>,
    state: WorkerState,
    last_cycle: Option<DateTime<Utc>>,
    last_signal: Option<Signal>,
    last_error: Option<String>,
}

impl SymbolWorker {
    #[must_use]
    pub fn new(
        symbol: String,
        timeframe: Timeframe,
        engine: Arc<SignalEngine>,
        risk: Arc<RiskManager>,
        portfolio: Arc<Mutex<Portfolio>>,
        live: LiveConfig,
        rx: mpsc::Receiver<WorkerCommand>,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            engine,
            risk,
            portfolio,
            live,
            rx,
            state: WorkerState::Stopped,
            last_cycle: None,
            last_signal: None,
            last_error: None,
        }
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            symbol: self.symbol.clone(),
            state: self.state,
            last_cycle: self.last_cycle,
            last_signal: self.last_signal.clone(),
            error: self.last_error.clone(),
        }
    }

    /// Actor loop: consumes commands and, while running, polls on the
    /// configured interval until shut down or orphaned.
    pub async fn run(mut self) {
        let mut poll =
            tokio::time::interval(Duration::from_secs(self.live.poll_interval_secs.max(1)));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(symbol = %self.symbol, timeframe = %self.timeframe, "worker spawned");

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(WorkerCommand::Start) => {
                        if self.state != WorkerState::Running {
                            tracing::info!(symbol = %self.symbol, "worker started");
                            self.state = WorkerState::Running;
                        }
                    }
                    Some(WorkerCommand::Stop) => {
                        if self.state != WorkerState::Stopped {
                            tracing::info!(symbol = %self.symbol, "worker stopped");
                            self.state = WorkerState::Stopped;
                        }
                    }
                    Some(WorkerCommand::GetStatus(reply)) => {
                        let _ = reply.send(self.status());
                    }
                    Some(WorkerCommand::Shutdown) | None => break,
                },
                _ = poll.tick(), if self.state == WorkerState::Running => {
                    self.cycle().await;
                }
            }
        }
        tracing::info!(symbol = %self.symbol, "worker shut down");
    }

    /// One poll cycle. Collaborator failures are retried with backoff;
    /// when retries are exhausted the cycle is skipped and the error is
    /// surfaced on the status, never turned into a flat decision.
    async fn cycle(&mut self) {
        let as_of = Utc::now();
        let backoff = Duration::from_secs(self.live.retry_backoff_secs);
        let engine = Arc::clone(&self.engine);
        let symbol = self.symbol.clone();
        let timeframe = self.timeframe;

        let observed = with_retry("signal poll", self.live.max_retries, backoff, || {
            engine.observe(&symbol, timeframe, as_of)
        })
        .await;

        match observed {
            Ok(Some(observation)) => {
                match self.apply(&observation, as_of).await {
                    Ok(()) => self.last_error = None,
                    Err(e) => {
                        tracing::error!(symbol = %self.symbol, error = %e, "cycle failed");
                        self.last_error = Some(format!("{e:#}"));
                    }
                }
                self.last_signal = Some(observation.signal);
            }
            Ok(None) => self.last_error = None,
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, error = %e, "cycle skipped");
                self.last_error = Some(e.to_string());
            }
        }
        self.last_cycle = Some(as_of);
    }

    /// Applies one observation to the shared book: manage the open
    /// position's exits, or evaluate a fresh entry, then mark equity. All
    /// of it under a single lock hold.
    async fn apply(&self, observation: &Observation, as_of: DateTime<Utc>) -> Result<()> {
        let price =
            Decimal::try_from(observation.snapshot.close).context("mark price not representable")?;
        let mut book = self.portfolio.lock().await;

        let exit = book.position(&self.symbol).and_then(|p| {
            mark_exit(p, price).or_else(|| {
                opposes(p.direction, observation.signal.direction).then_some(ExitReason::SignalExit)
            })
        });
        if let Some(reason) = exit {
            let trade = book.close_position(&self.symbol, price, reason, as_of)?;
            tracing::info!(symbol = %self.symbol, pnl = %trade.pnl, ?reason, "position closed");
        } else if book.position(&self.symbol).is_none()
            && observation.signal.direction != SignalDirection::Flat
        {
            let atr = observation
                .snapshot
                .atr
                .and_then(|a| Decimal::try_from(a).ok())
                .filter(|a| *a > Decimal::ZERO);
            if let RiskDecision::Approved(intent) =
                self.risk.evaluate(&observation.signal, price, atr, &book)
            {
                book.open_position(Position::from_intent(&intent, price, as_of))?;
                tracing::info!(
                    symbol = %self.symbol,
                    size = %intent.size,
                    stop = %intent.stop_loss,
                    "position opened"
                );
            }
        }

        let equity = book.equity_at(&self.symbol, price);
        book.record_equity(as_of, equity);
        Ok(())
    }
}

/// Whether a fused signal points against an open position.
const fn opposes(held: Direction, signal: SignalDirection) -> bool {
    matches!(
        (held, signal),
        (Direction::Long, SignalDirection::Short) | (Direction::Short, SignalDirection::Long)
    )
}

/// Exit decision from the latest mark price. Live cycles see closes, not
/// intrabar ranges, so both levels are compared against the mark.
fn mark_exit(position: &Position, price: Decimal) -> Option<ExitReason> {
    match position.direction {
        Direction::Long => {
            if price <= position.stop_loss {
                Some(ExitReason::StopLoss)
            } else if price >= position.take_profit {
                Some(ExitReason::TakeProfit)
            } else {
                None
            }
        }
        Direction::Short => {
            if price >= position.stop_loss {
                Some(ExitReason::StopLoss)
            } else if price <= position.take_profit {
                Some(ExitReason::TakeProfit)
            } else {
                None
            }
        }
    }
}
