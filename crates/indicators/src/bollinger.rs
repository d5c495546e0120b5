use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerValue {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Simple moving average plus/minus a multiple of the rolling (population)
/// standard deviation over the same window. A zero-variance window yields
/// bands collapsed onto the mean.
#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    mult: f64,
    window: VecDeque<f64>,
}

impl Bollinger {
    #[must_use]
    pub fn new(period: usize, mult: f64) -> Self {
        let period = period.max(1);
        Self {
            period,
            mult,
            window: VecDeque::with_capacity(period + 1),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<BollingerValue> {
        self.window.push_back(close);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        self.value()
    }

    #[must_use]
    pub fn value(&self) -> Option<BollingerValue> {
        if self.window.len() < self.period {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.period as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self.window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        // Guard against a tiny negative from floating point cancellation.
        let std_dev = variance.max(0.0).sqrt();
        Some(BollingerValue {
            upper: self.mult.mul_add(std_dev, mean),
            middle: mean,
            lower: self.mult.mul_add(-std_dev, mean),
        })
    }
}
