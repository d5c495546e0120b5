use crate::ema::Ema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line (fast EMA minus slow EMA) with a signal-line EMA of that
/// difference. Produces a value only once the slow EMA and the signal EMA
/// have both filled their lookback.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    value: Option<MacdValue>,
}

impl Macd {
    #[must_use]
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
            value: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<MacdValue> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let (Some(fast), Some(slow)) = (fast, slow) else {
            return None;
        };
        let macd = fast - slow;
        let signal = self.signal.update(macd)?;
        let value = MacdValue {
            macd,
            signal,
            histogram: macd - signal,
        };
        self.value = Some(value);
        Some(value)
    }

    #[must_use]
    pub const fn value(&self) -> Option<MacdValue> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gated_on_slow_plus_signal_lookback() {
        let mut macd = Macd::new(3, 5, 2);
        let mut produced_at = None;
        for i in 0..10 {
            if macd.update(100.0 + f64::from(i)).is_some() && produced_at.is_none() {
                produced_at = Some(i);
            }
        }
        // Slow EMA ready at bar index 4, signal EMA needs 2 macd values.
        assert_eq!(produced_at, Some(5));
    }

    #[test]
    fn flat_series_is_all_zero() {
        let mut macd = Macd::new(12, 26, 9);
        let mut last = None;
        for _ in 0..60 {
            last = macd.update(250.0);
        }
        let v = last.unwrap();
        assert_eq!(v.macd, 0.0);
        assert_eq!(v.signal, 0.0);
        assert_eq!(v.histogram, 0.0);
    }

    #[test]
    fn uptrend_turns_histogram_positive() {
        let mut macd = Macd::new(3, 6, 3);
        let mut last = None;
        for i in 0..40 {
            last = macd.update(100.0 + 2.0 * f64::from(i));
        }
        assert!(last.unwrap().macd > 0.0);
    }
}
