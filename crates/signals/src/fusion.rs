use crate::technical::technical_score;
use chrono::{DateTime, Duration, Utc};
use senti_trade_core::{FusionConfig, SentimentScore, Signal, SignalDirection};
use senti_trade_indicators::IndicatorSnapshot;

/// Combines the technical sub-score and the sentiment score in effect into
/// one directional signal.
///
/// Weights and thresholds come entirely from [`FusionConfig`]; the fusion
/// itself is a pure function of the snapshot and the sentiment score, which
/// keeps it trivially deterministic and lookahead-free (it can only see
/// what the caller has already observed).
#[derive(Debug, Clone)]
pub struct SignalFusion {
    config: FusionConfig,
}

impl SignalFusion {
    #[must_use]
    pub const fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Decay factor for a sentiment score of the given age: 1 inside the
    /// configured window, then linear to 0 at twice the window. Stale
    /// sentiment fades rather than dominating a fresh technical read.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn staleness_decay(&self, age: Duration) -> f64 {
        let window = Duration::hours(self.config.sentiment_window_hours.max(1));
        if age <= window {
            return 1.0;
        }
        let window_secs = window.num_seconds() as f64;
        let excess_secs = (age - window).num_seconds() as f64;
        (1.0 - excess_secs / window_secs).max(0.0)
    }

    /// The decayed sentiment sub-score for a score observed at or before
    /// `as_of`.
    #[must_use]
    pub fn sentiment_subscore(&self, sentiment: &SentimentScore, as_of: DateTime<Utc>) -> f64 {
        let decayed = sentiment.compound * self.staleness_decay(sentiment.age(as_of));
        decayed.clamp(-1.0, 1.0)
    }

    /// Fuses the indicator snapshot and the sentiment score in effect at
    /// `snapshot.timestamp` into a [`Signal`].
    ///
    /// Missing sentiment (none ever observed for the symbol) redistributes
    /// the sentiment weight to technical; a snapshot with no computable
    /// indicator yields a flat signal.
    #[must_use]
    pub fn fuse(
        &self,
        symbol: &str,
        snapshot: &IndicatorSnapshot,
        sentiment: Option<&SentimentScore>,
    ) -> Signal {
        let as_of = snapshot.timestamp;

        // A score stamped after the bar would be future information; the
        // collaborator contract forbids it, so drop it rather than fuse it.
        let sentiment = sentiment.filter(|s| {
            if s.timestamp > as_of {
                tracing::warn!(
                    symbol,
                    score_at = %s.timestamp,
                    bar_at = %as_of,
                    "ignoring sentiment stamped after the decision bar"
                );
                return false;
            }
            true
        });

        let technical = technical_score(snapshot, &self.config);
        let sentiment_sub = sentiment.map(|s| self.sentiment_subscore(s, as_of));

        let blend = match (technical, sentiment_sub) {
            (Some(tech), Some(senti)) => {
                let wt = self.config.technical_weight;
                let ws = self.config.sentiment_weight;
                let total = wt + ws;
                if total <= 0.0 {
                    None
                } else {
                    Some((wt * tech + ws * senti) / total)
                }
            }
            // No sentiment ever seen: full weight on technical.
            (Some(tech), None) => Some(tech),
            // No technical read: never trade on sentiment alone.
            (None, _) => None,
        };

        let Some(blend) = blend.map(|b| b.clamp(-1.0, 1.0)) else {
            return Signal {
                sentiment_score: sentiment_sub,
                ..Signal::flat(symbol.to_string(), as_of)
            };
        };

        let threshold = self.config.entry_threshold;
        // Ties at exactly the threshold resolve to flat.
        let direction = if blend > threshold {
            SignalDirection::Long
        } else if blend < -threshold {
            SignalDirection::Short
        } else {
            SignalDirection::Flat
        };

        Signal {
            symbol: symbol.to_string(),
            timestamp: as_of,
            direction,
            strength: blend.abs().clamp(0.0, 1.0),
            technical_score: technical,
            sentiment_score: sentiment_sub,
        }
    }
}
