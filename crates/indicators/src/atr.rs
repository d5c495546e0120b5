/// Average true range with Wilder smoothing, used by the risk layer to
/// derive volatility stops. The first bar's true range is its high-low
/// span; later bars take the max of the span and the gaps from the prior
/// close.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Atr {
    #[must_use]
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let true_range = match self.prev_close {
            Some(prev) => (high - low).max((high - prev).abs()).max((low - prev).abs()),
            None => high - low,
        };
        self.prev_close = Some(close);

        #[allow(clippy::cast_precision_loss)]
        let period = self.period as f64;

        match self.value {
            Some(prev) => {
                self.value = Some((prev * (period - 1.0) + true_range) / period);
            }
            None => {
                self.seed_sum += true_range;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.value = Some(self.seed_sum / period);
                }
            }
        }
        self.value
    }

    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        self.value
    }
}
