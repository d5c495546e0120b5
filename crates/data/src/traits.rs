use async_trait::async_trait;
use chrono::{DateTime, Utc};
use senti_trade_core::{MarketDataError, PriceBar, SentimentScore, Timeframe};

/// Ordered bar retrieval. Implementations must return bars strictly
/// increasing by timestamp, restricted to `[start, end]` inclusive.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, MarketDataError>;
}

/// Sentiment retrieval. Returns the most recent score at or before `as_of`
/// for the symbol, or `None` when no score has ever been produced. Never
/// returns a score stamped after `as_of`.
#[async_trait]
pub trait SentimentFeed: Send + Sync {
    async fn get_sentiment(
        &self,
        symbol: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<SentimentScore>, MarketDataError>;
}
