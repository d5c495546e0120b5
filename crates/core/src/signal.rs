use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a fused trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalDirection {
    Long,
    Short,
    Flat,
}

/// Fused directional recommendation for a symbol at a point in time.
///
/// Derived from the indicator snapshot and the sentiment score in effect at
/// `timestamp`; never persisted independently of the bar that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: SignalDirection,
    /// Confidence in [0, 1].
    pub strength: f64,
    /// Technical sub-score in [-1, 1]; `None` when no indicator had enough
    /// lookback to produce a value.
    pub technical_score: Option<f64>,
    /// Decayed sentiment sub-score in [-1, 1]; `None` when no sentiment has
    /// ever been observed for the symbol.
    pub sentiment_score: Option<f64>,
}

impl Signal {
    /// A flat signal carrying no conviction, used when nothing is computable.
    #[must_use]
    pub fn flat(symbol: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol,
            timestamp,
            direction: SignalDirection::Flat,
            strength: 0.0,
            technical_score: None,
            sentiment_score: None,
        }
    }
}

/// Direction of an open position. Unlike [`SignalDirection`] there is no
/// flat variant: a flat book is the absence of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// A fully risk-validated order the execution layer may act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub direction: Direction,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl OrderIntent {
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.size * self.entry_price
    }
}
