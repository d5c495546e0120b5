use senti_trade_core::PriceBar;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Rolling support/resistance from window extremes: support is the lowest
/// low and resistance the highest high over the last `window` bars.
#[derive(Debug, Clone)]
pub struct PivotLevels {
    window: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
}

impl PivotLevels {
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            highs: VecDeque::with_capacity(window + 1),
            lows: VecDeque::with_capacity(window + 1),
        }
    }

    pub fn update(&mut self, high: f64, low: f64) -> Option<SupportResistance> {
        self.highs.push_back(high);
        self.lows.push_back(low);
        if self.highs.len() > self.window {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        self.value()
    }

    #[must_use]
    pub fn value(&self) -> Option<SupportResistance> {
        if self.highs.len() < self.window {
            return None;
        }
        let resistance = self.highs.iter().copied().fold(f64::MIN, f64::max);
        let support = self.lows.iter().copied().fold(f64::MAX, f64::min);
        Some(SupportResistance {
            support,
            resistance,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeBucket {
    pub price_level: f64,
    pub volume: f64,
}

/// Volume traded per price bucket over `bars`, split into `bins` equal
/// price ranges between the window's lowest low and highest high. A bar's
/// volume is attributed to the bucket containing its low, matching the
/// upstream collectors' convention.
#[must_use]
pub fn volume_profile(bars: &[PriceBar], bins: usize) -> Vec<VolumeBucket> {
    if bars.is_empty() || bins == 0 {
        return Vec::new();
    }
    let lows: Vec<f64> = bars.iter().map(|b| b.low.to_f64().unwrap_or(0.0)).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high.to_f64().unwrap_or(0.0)).collect();
    let floor = lows.iter().copied().fold(f64::MAX, f64::min);
    let ceiling = highs.iter().copied().fold(f64::MIN, f64::max);
    #[allow(clippy::cast_precision_loss)]
    let bin_size = (ceiling - floor) / bins as f64;

    (0..bins)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let price_level = (i as f64).mul_add(bin_size, floor);
            let upper = price_level + bin_size;
            let volume = bars
                .iter()
                .zip(&lows)
                .filter(|(_, low)| {
                    // Last bucket is closed on top so the window max is counted.
                    **low >= price_level && (**low < upper || (i == bins - 1 && **low <= upper))
                })
                .map(|(bar, _)| bar.volume.to_f64().unwrap_or(0.0))
                .sum();
            VolumeBucket {
                price_level,
                volume,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(low: rust_decimal::Decimal, high: rust_decimal::Decimal, volume: rust_decimal::Decimal) -> PriceBar {
        PriceBar {
            symbol: "BTC".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: low,
            high,
            low,
            close: high,
            volume,
        }
    }

    #[test]
    fn pivot_levels_track_window_extremes() {
        let mut levels = PivotLevels::new(3);
        assert!(levels.update(10.0, 9.0).is_none());
        levels.update(12.0, 8.0);
        let v = levels.update(11.0, 9.5).unwrap();
        assert_eq!(v.resistance, 12.0);
        assert_eq!(v.support, 8.0);

        // The first bar rolls out of the window.
        let v = levels.update(10.5, 9.0).unwrap();
        assert_eq!(v.resistance, 12.0);
        assert_eq!(v.support, 8.0);
        let v = levels.update(10.0, 9.8).unwrap();
        assert_eq!(v.resistance, 11.0);
        assert_eq!(v.support, 9.0);
    }

    #[test]
    fn volume_profile_buckets_sum_to_total() {
        let bars = vec![
            bar(dec!(100), dec!(110), dec!(5)),
            bar(dec!(105), dec!(115), dec!(3)),
            bar(dec!(110), dec!(120), dec!(2)),
        ];
        let profile = volume_profile(&bars, 4);
        assert_eq!(profile.len(), 4);
        let total: f64 = profile.iter().map(|b| b.volume).sum();
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_yields_empty_profile() {
        assert!(volume_profile(&[], 10).is_empty());
    }
}
