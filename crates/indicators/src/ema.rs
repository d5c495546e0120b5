/// Exponential moving average with the standard smoothing constant
/// `alpha = 2 / (period + 1)`, seeded with the simple average of the first
/// `period` inputs. Produces no value before the seed window fills.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Ema {
    #[must_use]
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        #[allow(clippy::cast_precision_loss)]
        let alpha = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            alpha,
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn update(&mut self, input: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = self.alpha.mul_add(input - prev, prev);
                self.value = Some(next);
            }
            None => {
                self.seed_sum += input;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    #[allow(clippy::cast_precision_loss)]
                    let sma = self.seed_sum / self.period as f64;
                    self.value = Some(sma);
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
