use crate::atr::Atr;
use crate::bollinger::{Bollinger, BollingerValue};
use crate::ema::Ema;
use crate::levels::{volume_profile, PivotLevels, SupportResistance, VolumeBucket};
use crate::macd::{Macd, MacdValue};
use crate::rsi::Rsi;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use senti_trade_core::{IndicatorConfig, PriceBar};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// All indicator readings as of one bar. Fields are `None` until the
/// corresponding lookback window has filled; absence is never encoded as a
/// zero reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub rsi: Option<f64>,
    pub macd: Option<MacdValue>,
    pub bollinger: Option<BollingerValue>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub atr: Option<f64>,
    pub levels: Option<SupportResistance>,
}

impl IndicatorSnapshot {
    /// True when no indicator has produced a value yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rsi.is_none()
            && self.macd.is_none()
            && self.bollinger.is_none()
            && self.ema_fast.is_none()
            && self.ema_slow.is_none()
    }
}

/// Streaming indicator state for one symbol.
///
/// Strictly causal by construction: the engine is fed bars in order and the
/// snapshot after bar *t* depends only on bars up to and including *t*.
/// One engine per symbol; state is never shared across symbols.
#[derive(Debug)]
pub struct IndicatorEngine {
    rsi: Rsi,
    macd: Macd,
    bollinger: Bollinger,
    ema_fast: Ema,
    ema_slow: Ema,
    atr: Atr,
    levels: PivotLevels,
    window: VecDeque<PriceBar>,
    window_len: usize,
    volume_bins: usize,
}

impl IndicatorEngine {
    #[must_use]
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            bollinger: Bollinger::new(config.bollinger_period, config.bollinger_mult),
            ema_fast: Ema::new(config.ema_fast),
            ema_slow: Ema::new(config.ema_slow),
            atr: Atr::new(config.atr_period),
            levels: PivotLevels::new(config.pivot_window),
            window: VecDeque::with_capacity(config.pivot_window + 1),
            window_len: config.pivot_window.max(1),
            volume_bins: config.volume_bins,
        }
    }

    /// Feeds the next bar and returns the snapshot as of that bar.
    pub fn on_bar(&mut self, bar: &PriceBar) -> IndicatorSnapshot {
        let close = bar.close.to_f64().unwrap_or(0.0);
        let high = bar.high.to_f64().unwrap_or(0.0);
        let low = bar.low.to_f64().unwrap_or(0.0);

        self.window.push_back(bar.clone());
        if self.window.len() > self.window_len {
            self.window.pop_front();
        }

        IndicatorSnapshot {
            timestamp: bar.timestamp,
            close,
            rsi: self.rsi.update(close),
            macd: self.macd.update(close),
            bollinger: self.bollinger.update(close),
            ema_fast: self.ema_fast.update(close),
            ema_slow: self.ema_slow.update(close),
            atr: self.atr.update(high, low, close),
            levels: self.levels.update(high, low),
        }
    }

    /// Volume-per-price-bucket profile over the retained bar window.
    #[must_use]
    pub fn volume_profile(&self) -> Vec<VolumeBucket> {
        let bars: Vec<PriceBar> = self.window.iter().cloned().collect();
        volume_profile(&bars, self.volume_bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn flat_bar(i: i64) -> PriceBar {
        PriceBar {
            symbol: "BTC".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::hours(i),
            open: dec!(50000),
            high: dec!(50000),
            low: dec!(50000),
            close: dec!(50000),
            volume: dec!(10),
        }
    }

    fn small_config() -> IndicatorConfig {
        IndicatorConfig {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_mult: 2.0,
            ema_fast: 9,
            ema_slow: 21,
            atr_period: 14,
            pivot_window: 10,
            volume_bins: 5,
        }
    }

    #[test]
    fn early_bars_produce_absence_not_zero() {
        let mut engine = IndicatorEngine::new(&small_config());
        let snap = engine.on_bar(&flat_bar(0));
        assert!(snap.is_empty());
        assert!(snap.rsi.is_none());
        assert!(snap.atr.is_none());
    }

    #[test]
    fn flat_series_scenario() {
        // 50 flat bars: RSI at 50, zero band width, zero ATR.
        let mut engine = IndicatorEngine::new(&small_config());
        let mut snap = None;
        for i in 0..50 {
            snap = Some(engine.on_bar(&flat_bar(i)));
        }
        let snap = snap.unwrap();
        assert_eq!(snap.rsi, Some(50.0));
        assert_eq!(snap.bollinger.unwrap().width(), 0.0);
        assert_eq!(snap.atr, Some(0.0));
        assert_eq!(snap.macd.unwrap().histogram, 0.0);
        assert_eq!(snap.ema_fast, Some(50000.0));
    }

    #[test]
    fn snapshot_is_causal_under_future_modification() {
        // Feeding the same prefix must give identical snapshots regardless
        // of what comes after it.
        let bars: Vec<PriceBar> = (0..40)
            .map(|i| {
                let price = Decimal::from(50_000 + i * 13 % 700);
                PriceBar {
                    symbol: "BTC".to_string(),
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::hours(i),
                    open: price,
                    high: price + dec!(50),
                    low: price - dec!(50),
                    close: price,
                    volume: dec!(1),
                }
            })
            .collect();

        let mut original = IndicatorEngine::new(&small_config());
        let mut perturbed = IndicatorEngine::new(&small_config());

        let mut snap_original = None;
        for (i, bar) in bars.iter().enumerate() {
            let snap = original.on_bar(bar);
            if i == 29 {
                snap_original = Some(snap);
            }
        }

        let mut snap_perturbed = None;
        for (i, bar) in bars.iter().enumerate() {
            let mut bar = bar.clone();
            if i > 29 {
                bar.close = dec!(1);
                bar.high = dec!(2);
                bar.low = dec!(1);
            }
            let snap = perturbed.on_bar(&bar);
            if i == 29 {
                snap_perturbed = Some(snap);
            }
        }

        assert_eq!(snap_original, snap_perturbed);
    }

    #[test]
    fn volume_profile_covers_retained_window() {
        let mut engine = IndicatorEngine::new(&small_config());
        for i in 0..15 {
            engine.on_bar(&flat_bar(i));
        }
        let profile = engine.volume_profile();
        assert_eq!(profile.len(), 5);
        // Window holds the last 10 bars at 10 volume each.
        let total: f64 = profile.iter().map(|b| b.volume).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
