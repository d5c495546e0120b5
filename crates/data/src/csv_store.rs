use crate::traits::{MarketData, SentimentFeed};
use crate::validate::validate_ordering;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use senti_trade_core::{MarketDataError, PriceBar, SentimentScore, Timeframe};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Historical bar store backed by a CSV file, one timeframe per store.
///
/// CSV format: `timestamp,symbol,open,high,low,close,volume`. Rows are
/// sorted per symbol on load; duplicate timestamps are rejected.
#[derive(Debug)]
pub struct CsvBarStore {
    timeframe: Timeframe,
    bars: HashMap<String, Vec<PriceBar>>,
}

impl CsvBarStore {
    /// Loads and validates a bar file.
    ///
    /// # Errors
    /// Returns `Malformed` when the file cannot be read or a row fails to
    /// parse, and `DuplicateBar` when a symbol carries two rows with the
    /// same timestamp.
    pub fn from_csv(path: impl AsRef<Path>, timeframe: Timeframe) -> Result<Self, MarketDataError> {
        let mut reader = csv::Reader::from_path(path.as_ref())
            .map_err(|e| MarketDataError::Malformed(e.to_string()))?;

        let mut by_symbol: HashMap<String, Vec<PriceBar>> = HashMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| MarketDataError::Malformed(e.to_string()))?;
            let bar = parse_bar_record(&record)?;
            by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
        }

        for bars in by_symbol.values_mut() {
            bars.sort_by_key(|b| b.timestamp);
            validate_ordering(bars)?;
        }

        Ok(Self {
            timeframe,
            bars: by_symbol,
        })
    }

    /// Builds a store from already-typed bars (tests, fixtures).
    ///
    /// # Errors
    /// Returns an ordering error if a symbol's bars are not strictly
    /// increasing by timestamp.
    pub fn from_bars(
        bars: Vec<PriceBar>,
        timeframe: Timeframe,
    ) -> Result<Self, MarketDataError> {
        let mut by_symbol: HashMap<String, Vec<PriceBar>> = HashMap::new();
        for bar in bars {
            by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
        }
        for bars in by_symbol.values() {
            validate_ordering(bars)?;
        }
        Ok(Self {
            timeframe,
            bars: by_symbol,
        })
    }
}

fn parse_bar_record(record: &csv::StringRecord) -> Result<PriceBar, MarketDataError> {
    let field = |i: usize| {
        record
            .get(i)
            .ok_or_else(|| MarketDataError::Malformed(format!("missing column {i}")))
    };
    let decimal = |i: usize| -> Result<Decimal, MarketDataError> {
        Decimal::from_str(field(i)?)
            .map_err(|e| MarketDataError::Malformed(format!("column {i}: {e}")))
    };

    let timestamp: DateTime<Utc> = field(0)?
        .parse()
        .map_err(|e| MarketDataError::Malformed(format!("timestamp: {e}")))?;

    Ok(PriceBar {
        symbol: field(1)?.to_string(),
        timestamp,
        open: decimal(2)?,
        high: decimal(3)?,
        low: decimal(4)?,
        close: decimal(5)?,
        volume: decimal(6)?,
    })
}

#[async_trait]
impl MarketData for CsvBarStore {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        if timeframe != self.timeframe {
            return Err(MarketDataError::Malformed(format!(
                "store holds {} bars, requested {timeframe}",
                self.timeframe
            )));
        }
        Ok(self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Sentiment store backed by a CSV file.
///
/// CSV format: `timestamp,symbol,compound`. Serving is strictly
/// point-in-time: `get_sentiment` returns the most recent score at or
/// before `as_of`, never a later one.
pub struct CsvSentimentStore {
    scores: HashMap<String, Vec<SentimentScore>>,
}

impl CsvSentimentStore {
    /// Loads a sentiment file.
    ///
    /// # Errors
    /// Returns `Malformed` when the file cannot be read or a row fails to
    /// parse.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, MarketDataError> {
        let mut reader = csv::Reader::from_path(path.as_ref())
            .map_err(|e| MarketDataError::Malformed(e.to_string()))?;

        let mut by_symbol: HashMap<String, Vec<SentimentScore>> = HashMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| MarketDataError::Malformed(e.to_string()))?;
            let timestamp: DateTime<Utc> = record
                .get(0)
                .ok_or_else(|| MarketDataError::Malformed("missing timestamp".to_string()))?
                .parse()
                .map_err(|e| MarketDataError::Malformed(format!("timestamp: {e}")))?;
            let symbol = record
                .get(1)
                .ok_or_else(|| MarketDataError::Malformed("missing symbol".to_string()))?
                .to_string();
            let compound: f64 = record
                .get(2)
                .ok_or_else(|| MarketDataError::Malformed("missing compound".to_string()))?
                .parse()
                .map_err(|e| MarketDataError::Malformed(format!("compound: {e}")))?;

            by_symbol.entry(symbol.clone()).or_default().push(SentimentScore {
                symbol,
                timestamp,
                compound: compound.clamp(-1.0, 1.0),
                sources: Vec::new(),
            });
        }

        for scores in by_symbol.values_mut() {
            scores.sort_by_key(|s| s.timestamp);
        }

        Ok(Self { scores: by_symbol })
    }

    /// Builds a feed from already-typed scores (tests, fixtures).
    #[must_use]
    pub fn from_scores(scores: Vec<SentimentScore>) -> Self {
        let mut by_symbol: HashMap<String, Vec<SentimentScore>> = HashMap::new();
        for score in scores {
            by_symbol.entry(score.symbol.clone()).or_default().push(score);
        }
        for scores in by_symbol.values_mut() {
            scores.sort_by_key(|s| s.timestamp);
        }
        Self { scores: by_symbol }
    }

    /// An empty feed: no symbol has ever seen a score.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            scores: HashMap::new(),
        }
    }
}

#[async_trait]
impl SentimentFeed for CsvSentimentStore {
    async fn get_sentiment(
        &self,
        symbol: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<SentimentScore>, MarketDataError> {
        Ok(self.scores.get(symbol).and_then(|scores| {
            scores
                .iter()
                .rev()
                .find(|s| s.timestamp <= as_of)
                .cloned()
        }))
    }
}
