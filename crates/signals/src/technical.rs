use senti_trade_core::FusionConfig;
use senti_trade_indicators::{BollingerValue, IndicatorSnapshot};

/// RSI tilt: overbought reads negative, oversold positive, 50 neutral.
/// Linear in between so a 70 reading tilts harder than a 55.
#[must_use]
pub fn rsi_tilt(rsi: f64) -> f64 {
    ((50.0 - rsi) / 50.0).clamp(-1.0, 1.0)
}

/// MACD histogram sign: momentum above the signal line tilts long.
#[must_use]
pub fn macd_tilt(histogram: f64) -> f64 {
    if histogram > 0.0 {
        1.0
    } else if histogram < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Position of the close within the Bollinger band mapped to [-1, 1]:
/// at or below the lower band is fully long-tilted, at or above the upper
/// band fully short-tilted. A zero-width band contributes nothing.
#[must_use]
pub fn bollinger_tilt(close: f64, band: &BollingerValue) -> f64 {
    let half_width = band.upper - band.middle;
    if half_width <= 0.0 {
        return 0.0;
    }
    ((band.middle - close) / half_width).clamp(-1.0, 1.0)
}

/// Trend tilt from the fast/slow EMA relationship.
#[must_use]
pub fn ema_tilt(fast: f64, slow: f64) -> f64 {
    if fast > slow {
        1.0
    } else if fast < slow {
        -1.0
    } else {
        0.0
    }
}

/// Weighted average of the tilts whose indicators have produced a value.
///
/// Absent indicators drop out of the weight normalization rather than
/// counting as zero, so a thin early snapshot is not dragged toward
/// neutral by indicators that have not warmed up. Returns `None` when no
/// indicator has a value (insufficient lookback everywhere).
#[must_use]
pub fn technical_score(snapshot: &IndicatorSnapshot, config: &FusionConfig) -> Option<f64> {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    if let Some(rsi) = snapshot.rsi {
        weighted += config.rsi_weight * rsi_tilt(rsi);
        total_weight += config.rsi_weight;
    }
    if let Some(macd) = snapshot.macd {
        weighted += config.macd_weight * macd_tilt(macd.histogram);
        total_weight += config.macd_weight;
    }
    if let Some(band) = snapshot.bollinger {
        weighted += config.bollinger_weight * bollinger_tilt(snapshot.close, &band);
        total_weight += config.bollinger_weight;
    }
    if let (Some(fast), Some(slow)) = (snapshot.ema_fast, snapshot.ema_slow) {
        weighted += config.ema_weight * ema_tilt(fast, slow);
        total_weight += config.ema_weight;
    }

    if total_weight <= 0.0 {
        return None;
    }
    Some((weighted / total_weight).clamp(-1.0, 1.0))
}
