use crate::handle::WorkerHandle;
use crate::worker::SymbolWorker;
use anyhow::Result;
use senti_trade_core::{AppConfig, Portfolio, Timeframe};
use senti_trade_data::{MarketData, SentimentFeed};
use senti_trade_risk::RiskManager;
use senti_trade_signals::SignalEngine;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Spawns and tracks the per-symbol workers of one live session.
///
/// All workers evaluate risk against the same shared portfolio, so the
/// exposure and daily-loss limits apply to the book as a whole.
pub struct WorkerRegistry {
    workers: RwLock<HashMap<String, WorkerHandle>>,
    portfolio: Arc<Mutex<Portfolio>>,
    config: AppConfig,
}

impl WorkerRegistry {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let portfolio = Arc::new(Mutex::new(Portfolio::new(config.backtest.initial_capital)));
        Self {
            workers: RwLock::new(HashMap::new()),
            portfolio,
            config,
        }
    }

    /// The shared book all workers trade against.
    #[must_use]
    pub fn portfolio(&self) -> Arc<Mutex<Portfolio>> {
        Arc::clone(&self.portfolio)
    }

    /// Spawns a worker for `symbol`. The worker starts in the stopped
    /// state; call [`WorkerHandle::start`] to begin polling.
    ///
    /// # Errors
    /// Returns an error if the risk configuration is invalid.
    pub async fn spawn_worker(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        market: Arc<dyn MarketData>,
        sentiment: Arc<dyn SentimentFeed>,
    ) -> Result<WorkerHandle> {
        let risk = Arc::new(RiskManager::new(&self.config.risk)?);
        let engine = Arc::new(SignalEngine::new(market, sentiment, &self.config));
        let (tx, rx) = mpsc::channel(32);

        let worker = SymbolWorker::new(
            symbol.to_string(),
            timeframe,
            engine,
            risk,
            Arc::clone(&self.portfolio),
            self.config.live.clone(),
            rx,
        );
        tokio::spawn(worker.run());

        let handle = WorkerHandle::new(tx);
        self.workers
            .write()
            .await
            .insert(symbol.to_string(), handle.clone());
        Ok(handle)
    }

    /// Spawns one worker per configured symbol against shared collaborators.
    ///
    /// # Errors
    /// Returns an error if any worker fails to spawn.
    pub async fn spawn_all(
        &self,
        timeframe: Timeframe,
        market: Arc<dyn MarketData>,
        sentiment: Arc<dyn SentimentFeed>,
    ) -> Result<Vec<WorkerHandle>> {
        let symbols = self.config.symbols.clone();
        let mut handles = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            let handle = self
                .spawn_worker(
                    symbol,
                    timeframe,
                    Arc::clone(&market),
                    Arc::clone(&sentiment),
                )
                .await?;
            handles.push(handle);
        }
        Ok(handles)
    }

    #[must_use]
    pub async fn worker(&self, symbol: &str) -> Option<WorkerHandle> {
        self.workers.read().await.get(symbol).cloned()
    }

    #[must_use]
    pub async fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.workers.read().await.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Starts every registered worker.
    ///
    /// # Errors
    /// Returns an error if any worker's channel is closed.
    pub async fn start_all(&self) -> Result<()> {
        let handles: Vec<_> = self.workers.read().await.values().cloned().collect();
        for handle in handles {
            handle.start().await?;
        }
        Ok(())
    }

    /// Shuts down every registered worker and forgets it.
    ///
    /// # Errors
    /// Returns an error if any worker's channel is closed.
    pub async fn shutdown_all(&self) -> Result<()> {
        let mut workers = self.workers.write().await;
        for handle in workers.values() {
            handle.shutdown().await?;
        }
        workers.clear();
        Ok(())
    }
}
