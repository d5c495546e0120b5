use crate::signal::{Direction, OrderIntent};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position. Exactly one per symbol at a time; there is no
/// pyramiding into an existing position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    #[must_use]
    pub fn from_intent(intent: &OrderIntent, fill_price: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            symbol: intent.symbol.clone(),
            direction: intent.direction,
            size: intent.size,
            entry_price: fill_price,
            stop_loss: intent.stop_loss,
            take_profit: intent.take_profit,
            opened_at: at,
        }
    }

    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.size * self.entry_price
    }

    /// Mark-to-market pnl at `price`, sign-consistent with direction.
    #[must_use]
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        match self.direction {
            Direction::Long => (price - self.entry_price) * self.size,
            Direction::Short => (self.entry_price - price) * self.size,
        }
    }

    /// The stop must sit on the loss side of the entry for the direction.
    #[must_use]
    pub fn stop_is_protective(&self) -> bool {
        match self.direction {
            Direction::Long => self.stop_loss < self.entry_price,
            Direction::Short => self.stop_loss > self.entry_price,
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// A directional signal against the position closed it early.
    SignalExit,
    /// The run ended with the position still open; closed at the final bar.
    EndOfData,
}

/// Closed record of a position. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    pub exit_reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl Trade {
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.closed_at - self.opened_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long_position() -> Position {
        Position {
            symbol: "BTC".to_string(),
            direction: Direction::Long,
            size: dec!(0.5),
            entry_price: dec!(50000),
            stop_loss: dec!(49000),
            take_profit: dec!(52000),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn long_pnl_follows_price() {
        let pos = long_position();
        assert_eq!(pos.unrealized_pnl(dec!(51000)), dec!(500));
        assert_eq!(pos.unrealized_pnl(dec!(49000)), dec!(-500));
    }

    #[test]
    fn short_pnl_is_inverted() {
        let pos = Position {
            direction: Direction::Short,
            stop_loss: dec!(51000),
            take_profit: dec!(48000),
            ..long_position()
        };
        assert_eq!(pos.unrealized_pnl(dec!(49000)), dec!(500));
        assert!(pos.stop_is_protective());
    }

    #[test]
    fn stop_above_long_entry_is_not_protective() {
        let pos = Position {
            stop_loss: dec!(50500),
            ..long_position()
        };
        assert!(!pos.stop_is_protective());
    }
}
