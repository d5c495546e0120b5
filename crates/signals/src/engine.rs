use crate::fusion::SignalFusion;
use chrono::{DateTime, Utc};
use senti_trade_core::{AppConfig, IndicatorConfig, MarketDataError, Signal, Timeframe};
use senti_trade_data::{MarketData, SentimentFeed};
use senti_trade_indicators::{IndicatorEngine, IndicatorSnapshot};
use std::sync::Arc;

/// A fused signal together with the indicator snapshot it was derived
/// from. Callers that size positions need the snapshot's ATR and close.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub signal: Signal,
    pub snapshot: IndicatorSnapshot,
}

/// On-demand signal computation for the API/dashboard collaborators.
///
/// Replays the warmup window of bars ending at `as_of` through a fresh
/// indicator engine and fuses the final snapshot with the sentiment score
/// in effect, so the result is exactly what a backtest would have decided
/// at that bar.
pub struct SignalEngine {
    market: Arc<dyn MarketData>,
    sentiment: Arc<dyn SentimentFeed>,
    indicator_config: IndicatorConfig,
    fusion: SignalFusion,
    warmup_bars: usize,
}

impl SignalEngine {
    #[must_use]
    pub fn new(
        market: Arc<dyn MarketData>,
        sentiment: Arc<dyn SentimentFeed>,
        config: &AppConfig,
    ) -> Self {
        Self {
            market,
            sentiment,
            indicator_config: config.indicators.clone(),
            fusion: SignalFusion::new(config.fusion.clone()),
            warmup_bars: config.live.warmup_bars,
        }
    }

    /// Computes the fused signal for `symbol` as of `as_of`.
    ///
    /// Returns a flat signal when no bars exist in the warmup window.
    ///
    /// # Errors
    /// Propagates collaborator errors; retry policy is the caller's
    /// concern (the live workers wrap this in `with_retry`).
    pub async fn compute_signal(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        as_of: DateTime<Utc>,
    ) -> Result<Signal, MarketDataError> {
        Ok(match self.observe(symbol, timeframe, as_of).await? {
            Some(observation) => observation.signal,
            None => Signal::flat(symbol.to_string(), as_of),
        })
    }

    /// Like [`Self::compute_signal`] but keeps the indicator snapshot the
    /// signal came from. `None` when no bars exist in the warmup window.
    ///
    /// # Errors
    /// Propagates collaborator errors.
    pub async fn observe(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        as_of: DateTime<Utc>,
    ) -> Result<Option<Observation>, MarketDataError> {
        let lookback = i32::try_from(self.warmup_bars).unwrap_or(i32::MAX);
        let start = as_of - timeframe.duration() * lookback;
        let bars = self.market.get_bars(symbol, timeframe, start, as_of).await?;

        let mut engine = IndicatorEngine::new(&self.indicator_config);
        let mut snapshot = None;
        for bar in &bars {
            snapshot = Some(engine.on_bar(bar));
        }
        let Some(snapshot) = snapshot else {
            tracing::warn!(symbol, %timeframe, %as_of, "no bars in warmup window");
            return Ok(None);
        };

        let score = self
            .sentiment
            .get_sentiment(symbol, snapshot.timestamp)
            .await?;
        let signal = self.fusion.fuse(symbol, &snapshot, score.as_ref());
        Ok(Some(Observation { signal, snapshot }))
    }
}
