/// Relative Strength Index with Wilder smoothing.
///
/// The first average gain/loss is the simple mean of the first `period`
/// deltas; afterwards `avg = (avg * (period - 1) + delta) / period`.
/// A window with neither gains nor losses reads 50 (neutral), not a
/// division fault.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    seed_gain: f64,
    seed_loss: f64,
    seed_count: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl Rsi {
    #[must_use]
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev_close: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            seed_count: 0,
            avg_gain: None,
            avg_loss: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let Some(prev) = self.prev_close.replace(close) else {
            return None;
        };
        let delta = close - prev;
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        #[allow(clippy::cast_precision_loss)]
        let period = self.period as f64;

        match (self.avg_gain, self.avg_loss) {
            (Some(ag), Some(al)) => {
                self.avg_gain = Some((ag * (period - 1.0) + gain) / period);
                self.avg_loss = Some((al * (period - 1.0) + loss) / period);
            }
            _ => {
                self.seed_gain += gain;
                self.seed_loss += loss;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.avg_gain = Some(self.seed_gain / period);
                    self.avg_loss = Some(self.seed_loss / period);
                }
            }
        }

        self.value()
    }

    #[must_use]
    pub fn value(&self) -> Option<f64> {
        let (gain, loss) = (self.avg_gain?, self.avg_loss?);
        if gain == 0.0 && loss == 0.0 {
            // Flat window: neither side dominates.
            return Some(50.0);
        }
        if loss == 0.0 {
            return Some(100.0);
        }
        let rs = gain / loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}
