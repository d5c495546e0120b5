use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated sentiment for one symbol over one collection window.
///
/// Produced by the upstream sentiment collectors on a coarser cadence than
/// price bars. The score in effect at a bar is the most recent score at or
/// before the bar's timestamp; there is no interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Compound score in [-1, 1]; positive is bullish.
    pub compound: f64,
    /// Per-source contribution breakdown (e.g. reddit, news).
    #[serde(default)]
    pub sources: Vec<SourceContribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    pub source: String,
    /// Weight of this source in the compound score, in [0, 1].
    pub weight: f64,
    /// This source's own score in [-1, 1].
    pub score: f64,
}

impl SentimentScore {
    /// Age of this score relative to `as_of`. Zero if the score is newer
    /// (which callers should have already filtered out).
    #[must_use]
    pub fn age(&self, as_of: DateTime<Utc>) -> chrono::Duration {
        (as_of - self.timestamp).max(chrono::Duration::zero())
    }
}
