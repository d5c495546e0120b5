use anyhow::{Context, Result};
use rust_decimal::Decimal;
use senti_trade_core::{BacktestConfig, Direction};

/// Simulated fill pricing: slippage and commission folded into the fill
/// price, always against the trader. Entries pay on the way in, exits on
/// the way out, so a stop-loss fill realizes slightly worse than the stop
/// itself.
#[derive(Debug, Clone)]
pub struct FillSimulator {
    /// Combined per-fill cost as a price fraction.
    cost_rate: Decimal,
}

impl FillSimulator {
    /// # Errors
    /// Returns an error if the configured rates cannot be represented as
    /// `Decimal`.
    pub fn new(config: &BacktestConfig) -> Result<Self> {
        let slippage = Decimal::try_from(config.slippage_bps / 10_000.0)
            .context("invalid slippage_bps")?;
        let commission =
            Decimal::try_from(config.commission_rate).context("invalid commission_rate")?;
        Ok(Self {
            cost_rate: slippage + commission,
        })
    }

    /// Effective entry price for a position in `direction` at `price`.
    #[must_use]
    pub fn entry(&self, price: Decimal, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => price * (Decimal::ONE + self.cost_rate),
            Direction::Short => price * (Decimal::ONE - self.cost_rate),
        }
    }

    /// Effective exit price for a position in `direction` at `price`.
    #[must_use]
    pub fn exit(&self, price: Decimal, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => price * (Decimal::ONE - self.cost_rate),
            Direction::Short => price * (Decimal::ONE + self.cost_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn simulator(slippage_bps: f64, commission_rate: f64) -> FillSimulator {
        let config = BacktestConfig {
            slippage_bps,
            commission_rate,
            ..BacktestConfig::default()
        };
        FillSimulator::new(&config).unwrap()
    }

    #[test]
    fn costs_are_always_adverse() {
        let fills = simulator(10.0, 0.001);
        let price = dec!(50000);
        assert!(fills.entry(price, Direction::Long) > price);
        assert!(fills.exit(price, Direction::Long) < price);
        assert!(fills.entry(price, Direction::Short) < price);
        assert!(fills.exit(price, Direction::Short) > price);
    }

    #[test]
    fn zero_cost_is_identity() {
        let fills = simulator(0.0, 0.0);
        assert_eq!(fills.entry(dec!(123.45), Direction::Long), dec!(123.45));
        assert_eq!(fills.exit(dec!(123.45), Direction::Short), dec!(123.45));
    }

    #[test]
    fn ten_bps_moves_price_by_a_tenth_percent() {
        let fills = simulator(10.0, 0.0);
        assert_eq!(fills.entry(dec!(10000), Direction::Long), dec!(10010));
    }
}
