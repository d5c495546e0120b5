use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use senti_trade_core::{
    Direction, OrderIntent, Portfolio, RiskConfig, Signal, SignalDirection,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a trade was refused. Rejections are values, not errors: the run
/// continues, and every rejection is reported with its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Realized losses today already exceed the configured daily limit.
    DailyLossLimit,
    /// The symbol already has an open position (no pyramiding).
    PositionAlreadyOpen,
    /// The computed size rounded to zero.
    SizeRoundsToZero,
    /// Post-trade aggregate exposure would exceed the cap.
    ExposureCapExceeded,
    /// No ATR available yet (or zero volatility), so no stop can be derived.
    NoVolatilityEstimate,
    /// The signal carried no direction.
    FlatSignal,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DailyLossLimit => "daily loss limit reached",
            Self::PositionAlreadyOpen => "position already open",
            Self::SizeRoundsToZero => "computed size rounds to zero",
            Self::ExposureCapExceeded => "aggregate exposure cap exceeded",
            Self::NoVolatilityEstimate => "no volatility estimate for stop derivation",
            Self::FlatSignal => "signal is flat",
        };
        f.write_str(text)
    }
}

/// Outcome of risk evaluation: an admissible order intent or a reasoned
/// rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RiskDecision {
    Approved(OrderIntent),
    Rejected {
        symbol: String,
        timestamp: DateTime<Utc>,
        reason: RejectReason,
    },
}

/// Converts a signal plus portfolio state into an admissible position, or
/// vetoes it.
///
/// Sizing is stop-distance based: the capital fraction risked between
/// entry and stop is fixed, then the size is capped by the per-position
/// limit and the remaining exposure headroom. All percentages are carried
/// as `Decimal` so repeated runs cannot drift.
pub struct RiskManager {
    risk_per_trade_pct: Decimal,
    max_position_pct: Decimal,
    max_exposure_pct: Decimal,
    max_daily_loss_pct: Decimal,
    atr_stop_multiple: Decimal,
    reward_ratio: Decimal,
}

impl RiskManager {
    /// Builds a manager from the validated configuration.
    ///
    /// # Errors
    /// Returns an error if a configured percentage cannot be represented
    /// as a `Decimal` or is out of [0, 1].
    pub fn new(config: &RiskConfig) -> Result<Self> {
        let pct = |value: f64, name: &str| -> Result<Decimal> {
            let d = Decimal::try_from(value).with_context(|| format!("invalid {name}"))?;
            if d < Decimal::ZERO || d > Decimal::ONE {
                anyhow::bail!("{name} must be within [0, 1], got {d}");
            }
            Ok(d)
        };
        Ok(Self {
            risk_per_trade_pct: pct(config.risk_per_trade_pct, "risk_per_trade_pct")?,
            max_position_pct: pct(config.max_position_pct, "max_position_pct")?,
            max_exposure_pct: pct(config.max_exposure_pct, "max_exposure_pct")?,
            max_daily_loss_pct: pct(config.max_daily_loss_pct, "max_daily_loss_pct")?,
            atr_stop_multiple: Decimal::try_from(config.atr_stop_multiple)
                .context("invalid atr_stop_multiple")?,
            reward_ratio: Decimal::try_from(config.reward_ratio).context("invalid reward_ratio")?,
        })
    }

    /// Evaluates a signal against the portfolio.
    ///
    /// `atr` is the current volatility estimate used to derive the stop
    /// when the signal does not carry one; without it no stop distance
    /// exists and the trade is vetoed.
    #[must_use]
    pub fn evaluate(
        &self,
        signal: &Signal,
        entry_price: Decimal,
        atr: Option<Decimal>,
        portfolio: &Portfolio,
    ) -> RiskDecision {
        let reject = |reason: RejectReason| {
            tracing::warn!(symbol = %signal.symbol, %reason, "trade rejected");
            RiskDecision::Rejected {
                symbol: signal.symbol.clone(),
                timestamp: signal.timestamp,
                reason,
            }
        };

        let direction = match signal.direction {
            SignalDirection::Long => Direction::Long,
            SignalDirection::Short => Direction::Short,
            SignalDirection::Flat => return reject(RejectReason::FlatSignal),
        };

        if portfolio.position(&signal.symbol).is_some() {
            return reject(RejectReason::PositionAlreadyOpen);
        }

        let capital = portfolio.capital();
        let daily_loss = portfolio.realized_loss_since(start_of_utc_day(signal.timestamp));
        if daily_loss >= self.max_daily_loss_pct * capital {
            return reject(RejectReason::DailyLossLimit);
        }

        let Some(atr) = atr.filter(|a| *a > Decimal::ZERO) else {
            return reject(RejectReason::NoVolatilityEstimate);
        };
        let stop_distance = self.atr_stop_multiple * atr;
        let (stop_loss, take_profit) = match direction {
            Direction::Long => (
                entry_price - stop_distance,
                entry_price + self.reward_ratio * stop_distance,
            ),
            Direction::Short => (
                entry_price + stop_distance,
                entry_price - self.reward_ratio * stop_distance,
            ),
        };

        // size = (capital × risk-per-trade) / stop distance, then capped.
        let risk_amount = capital * self.risk_per_trade_pct;
        let mut size = risk_amount / stop_distance;

        let max_position_value = capital * self.max_position_pct;
        size = size.min(max_position_value / entry_price);

        let headroom = self.max_exposure_pct * capital - portfolio.open_exposure();
        if headroom <= Decimal::ZERO {
            return reject(RejectReason::ExposureCapExceeded);
        }
        size = size.min(headroom / entry_price);

        // Round toward zero at 8 decimal places (crypto quantity convention)
        // so rounding can never push notional past a cap.
        size = size.round_dp_with_strategy(8, RoundingStrategy::ToZero);
        if size <= Decimal::ZERO {
            return reject(RejectReason::SizeRoundsToZero);
        }

        RiskDecision::Approved(OrderIntent {
            symbol: signal.symbol.clone(),
            direction,
            size,
            entry_price,
            stop_loss,
            take_profit,
            timestamp: signal.timestamp,
        })
    }
}

/// Midnight UTC of the day containing `at`; the daily loss window resets
/// here.
#[must_use]
pub fn start_of_utc_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(at, |naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use senti_trade_core::{ExitReason, Position};

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).unwrap()
    }

    fn long_signal() -> Signal {
        Signal {
            symbol: "BTC".to_string(),
            timestamp: ts(10),
            direction: SignalDirection::Long,
            strength: 0.7,
            technical_score: Some(0.7),
            sentiment_score: Some(0.5),
        }
    }

    fn manager(config: RiskConfig) -> RiskManager {
        RiskManager::new(&config).unwrap()
    }

    fn approved(decision: RiskDecision) -> OrderIntent {
        match decision {
            RiskDecision::Approved(intent) => intent,
            RiskDecision::Rejected { reason, .. } => panic!("unexpected rejection: {reason}"),
        }
    }

    fn rejection_reason(decision: RiskDecision) -> RejectReason {
        match decision {
            RiskDecision::Rejected { reason, .. } => reason,
            RiskDecision::Approved(_) => panic!("unexpected approval"),
        }
    }

    #[test]
    fn stop_distance_sizing_scenario() {
        // Capital 10,000, risk 1%, entry 50,000, ATR 500 at 2x → stop
        // 49,000, distance 1,000 → size 100/1000 = 0.1 units.
        let config = RiskConfig {
            risk_per_trade_pct: 0.01,
            max_position_pct: 0.60,
            max_exposure_pct: 1.0,
            ..RiskConfig::default()
        };
        let portfolio = Portfolio::new(dec!(10000));
        let intent = approved(manager(config).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        ));
        assert_eq!(intent.size, dec!(0.1));
        assert_eq!(intent.stop_loss, dec!(49000));
        assert_eq!(intent.take_profit, dec!(52000));
    }

    #[test]
    fn max_position_cap_shrinks_the_size() {
        let config = RiskConfig {
            risk_per_trade_pct: 0.01,
            max_position_pct: 0.02, // caps notional at 200
            max_exposure_pct: 1.0,
            ..RiskConfig::default()
        };
        let portfolio = Portfolio::new(dec!(10000));
        let intent = approved(manager(config).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        ));
        assert_eq!(intent.size, dec!(0.004));
    }

    #[test]
    fn short_stops_sit_above_entry() {
        let signal = Signal {
            direction: SignalDirection::Short,
            ..long_signal()
        };
        let portfolio = Portfolio::new(dec!(10000));
        let intent = approved(manager(RiskConfig::default()).evaluate(
            &signal,
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        ));
        assert!(intent.stop_loss > intent.entry_price);
        assert!(intent.take_profit < intent.entry_price);
    }

    #[test]
    fn open_position_blocks_new_entry() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio
            .open_position(Position {
                symbol: "BTC".to_string(),
                direction: Direction::Long,
                size: dec!(0.01),
                entry_price: dec!(50000),
                stop_loss: dec!(49000),
                take_profit: dec!(52000),
                opened_at: ts(1),
            })
            .unwrap();

        let reason = rejection_reason(manager(RiskConfig::default()).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        ));
        assert_eq!(reason, RejectReason::PositionAlreadyOpen);
    }

    #[test]
    fn exposure_cap_is_never_exceeded() {
        let config = RiskConfig {
            risk_per_trade_pct: 0.5,
            max_position_pct: 1.0,
            max_exposure_pct: 0.3,
            ..RiskConfig::default()
        };
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio
            .open_position(Position {
                symbol: "ETH".to_string(),
                direction: Direction::Long,
                size: dec!(1),
                entry_price: dec!(2500),
                stop_loss: dec!(2400),
                take_profit: dec!(2700),
                opened_at: ts(1),
            })
            .unwrap();

        let decision = manager(config).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        );
        let intent = approved(decision);
        // Headroom is 3000 - 2500 = 500 of notional.
        assert!(intent.notional() + portfolio.open_exposure() <= dec!(3000));
    }

    #[test]
    fn exhausted_headroom_rejects_outright() {
        let config = RiskConfig {
            max_exposure_pct: 0.2,
            ..RiskConfig::default()
        };
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio
            .open_position(Position {
                symbol: "ETH".to_string(),
                direction: Direction::Long,
                size: dec!(1),
                entry_price: dec!(2000),
                stop_loss: dec!(1900),
                take_profit: dec!(2200),
                opened_at: ts(1),
            })
            .unwrap();

        let reason = rejection_reason(manager(config).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        ));
        assert_eq!(reason, RejectReason::ExposureCapExceeded);
    }

    #[test]
    fn daily_loss_limit_blocks_after_losses() {
        let config = RiskConfig {
            max_daily_loss_pct: 0.02,
            ..RiskConfig::default()
        };
        let mut portfolio = Portfolio::new(dec!(10300));
        portfolio
            .open_position(Position {
                symbol: "BTC".to_string(),
                direction: Direction::Long,
                size: dec!(0.3),
                entry_price: dec!(50000),
                stop_loss: dec!(49000),
                take_profit: dec!(52000),
                opened_at: ts(1),
            })
            .unwrap();
        portfolio
            .close_position("BTC", dec!(49000), ExitReason::StopLoss, ts(2))
            .unwrap();
        // Realized loss of 300 on the day vs a limit of 200.

        let reason = rejection_reason(manager(config).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        ));
        assert_eq!(reason, RejectReason::DailyLossLimit);
    }

    #[test]
    fn yesterdays_losses_do_not_count() {
        let mut portfolio = Portfolio::new(dec!(10300));
        portfolio
            .open_position(Position {
                symbol: "BTC".to_string(),
                direction: Direction::Long,
                size: dec!(0.3),
                entry_price: dec!(50000),
                stop_loss: dec!(49000),
                take_profit: dec!(52000),
                opened_at: ts(1) - chrono::Duration::days(1),
            })
            .unwrap();
        portfolio
            .close_position(
                "BTC",
                dec!(49000),
                ExitReason::StopLoss,
                ts(2) - chrono::Duration::days(1),
            )
            .unwrap();

        let decision = manager(RiskConfig::default()).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        );
        assert!(matches!(decision, RiskDecision::Approved(_)));
    }

    #[test]
    fn missing_atr_vetoes_the_trade() {
        let portfolio = Portfolio::new(dec!(10000));
        let reason = rejection_reason(manager(RiskConfig::default()).evaluate(
            &long_signal(),
            dec!(50000),
            None,
            &portfolio,
        ));
        assert_eq!(reason, RejectReason::NoVolatilityEstimate);

        let reason = rejection_reason(manager(RiskConfig::default()).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(0)),
            &portfolio,
        ));
        assert_eq!(reason, RejectReason::NoVolatilityEstimate);
    }

    #[test]
    fn dust_capital_rounds_to_zero_and_rejects() {
        let portfolio = Portfolio::new(dec!(0.000001));
        let reason = rejection_reason(manager(RiskConfig::default()).evaluate(
            &long_signal(),
            dec!(50000),
            Some(dec!(500)),
            &portfolio,
        ));
        assert_eq!(reason, RejectReason::SizeRoundsToZero);
    }

    #[test]
    fn out_of_range_percentage_fails_construction() {
        let config = RiskConfig {
            risk_per_trade_pct: 1.5,
            ..RiskConfig::default()
        };
        assert!(RiskManager::new(&config).is_err());
    }
}
