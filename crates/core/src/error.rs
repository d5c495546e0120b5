use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors at the market-data collaborator boundary.
///
/// Gap and ordering violations are detected where bars enter the system so
/// downstream components can assume clean, strictly ordered sequences.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("bars out of order for {symbol}: {current} follows {previous}")]
    OutOfOrder {
        symbol: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("duplicate bar for {symbol} at {timestamp}")]
    DuplicateBar {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("data gap for {symbol}: {gap_bars} missing bars after {after} (tolerance {tolerance})")]
    Gap {
        symbol: String,
        after: DateTime<Utc>,
        gap_bars: u32,
        tolerance: u32,
    },

    #[error("malformed market data: {0}")]
    Malformed(String),

    /// Transient collaborator failure (rate limit, auth, timeout). Retried
    /// with backoff at the boundary before it surfaces here.
    #[error("external service error: {0}")]
    External(String),
}
