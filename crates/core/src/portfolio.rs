use crate::position::{ExitReason, Position, Trade};
use crate::signal::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortfolioError {
    #[error("position already open for {0}")]
    PositionAlreadyOpen(String),
    #[error("no open position for {0}")]
    NoOpenPosition(String),
    #[error("capital exhausted: closing {symbol} would leave capital at {would_be}")]
    CapitalExhausted { symbol: String, would_be: Decimal },
}

/// One point on the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// The single mutable aggregate of a backtest run or live session.
///
/// Capital moves only on realized pnl; equity at any timestamp is capital
/// plus the unrealized pnl of open positions. Owned exclusively by one run
/// (or, in live mode, shared behind one lock) so every open/close is a
/// single atomic transaction against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    capital: Decimal,
    positions: HashMap<String, Position>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    #[must_use]
    pub fn new(starting_capital: Decimal) -> Self {
        Self {
            capital: starting_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    #[must_use]
    pub const fn capital(&self) -> Decimal {
        self.capital
    }

    #[must_use]
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    #[must_use]
    pub const fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    #[must_use]
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Aggregate notional of all open positions.
    #[must_use]
    pub fn open_exposure(&self) -> Decimal {
        self.positions.values().map(Position::notional).sum()
    }

    /// Equity given current mark prices. Symbols with no mark fall back to
    /// their entry price (zero unrealized pnl).
    #[must_use]
    pub fn equity(&self, marks: &HashMap<String, Decimal>) -> Decimal {
        let unrealized: Decimal = self
            .positions
            .values()
            .map(|p| marks.get(&p.symbol).map_or(Decimal::ZERO, |m| p.unrealized_pnl(*m)))
            .sum();
        self.capital + unrealized
    }

    /// Equity for a single-symbol book marked at `price`.
    #[must_use]
    pub fn equity_at(&self, symbol: &str, price: Decimal) -> Decimal {
        let unrealized = self
            .positions
            .get(symbol)
            .map_or(Decimal::ZERO, |p| p.unrealized_pnl(price));
        self.capital + unrealized
    }

    /// Opens a position. One open position per symbol; the caller has
    /// already validated sizing against the risk configuration.
    ///
    /// # Errors
    /// Returns `PositionAlreadyOpen` if the symbol has an open position.
    pub fn open_position(&mut self, position: Position) -> Result<(), PortfolioError> {
        if self.positions.contains_key(&position.symbol) {
            return Err(PortfolioError::PositionAlreadyOpen(position.symbol));
        }
        self.positions.insert(position.symbol.clone(), position);
        Ok(())
    }

    /// Closes the open position for `symbol` at `exit_price`, realizing its
    /// pnl into capital and appending the trade record.
    ///
    /// # Errors
    /// Returns `NoOpenPosition` if the symbol is flat, or `CapitalExhausted`
    /// if realizing the loss would take capital below zero.
    pub fn close_position(
        &mut self,
        symbol: &str,
        exit_price: Decimal,
        reason: ExitReason,
        at: DateTime<Utc>,
    ) -> Result<Trade, PortfolioError> {
        let position = self
            .positions
            .get(symbol)
            .ok_or_else(|| PortfolioError::NoOpenPosition(symbol.to_string()))?;

        let pnl = position.unrealized_pnl(exit_price);
        let new_capital = self.capital + pnl;
        if new_capital < Decimal::ZERO {
            return Err(PortfolioError::CapitalExhausted {
                symbol: symbol.to_string(),
                would_be: new_capital,
            });
        }

        let position = self.positions.remove(symbol).ok_or_else(|| {
            PortfolioError::NoOpenPosition(symbol.to_string())
        })?;
        self.capital = new_capital;

        let trade = Trade {
            symbol: position.symbol,
            direction: position.direction,
            size: position.size,
            entry_price: position.entry_price,
            exit_price,
            pnl,
            exit_reason: reason,
            opened_at: position.opened_at,
            closed_at: at,
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Appends a point to the equity curve.
    pub fn record_equity(&mut self, timestamp: DateTime<Utc>, equity: Decimal) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    /// Sum of realized losses (as a positive number) for trades closed at or
    /// after `cutoff`. Drives the daily loss limit.
    #[must_use]
    pub fn realized_loss_since(&self, cutoff: DateTime<Utc>) -> Decimal {
        self.trades
            .iter()
            .filter(|t| t.closed_at >= cutoff && t.pnl < Decimal::ZERO)
            .map(|t| -t.pnl)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn btc_long(size: Decimal, entry: Decimal) -> Position {
        Position {
            symbol: "BTC".to_string(),
            direction: Direction::Long,
            size,
            entry_price: entry,
            stop_loss: entry - dec!(1000),
            take_profit: entry + dec!(2000),
            opened_at: ts(0),
        }
    }

    #[test]
    fn open_then_close_realizes_pnl_into_capital() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.open_position(btc_long(dec!(0.1), dec!(50000))).unwrap();
        assert_eq!(portfolio.open_exposure(), dec!(5000));

        let trade = portfolio
            .close_position("BTC", dec!(52000), ExitReason::TakeProfit, ts(4))
            .unwrap();
        assert_eq!(trade.pnl, dec!(200));
        assert_eq!(portfolio.capital(), dec!(10200));
        assert!(portfolio.position("BTC").is_none());
    }

    #[test]
    fn second_open_for_same_symbol_is_rejected() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.open_position(btc_long(dec!(0.1), dec!(50000))).unwrap();
        let err = portfolio.open_position(btc_long(dec!(0.1), dec!(51000))).unwrap_err();
        assert_eq!(err, PortfolioError::PositionAlreadyOpen("BTC".to_string()));
    }

    #[test]
    fn equity_is_capital_plus_unrealized() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.open_position(btc_long(dec!(0.1), dec!(50000))).unwrap();
        assert_eq!(portfolio.equity_at("BTC", dec!(51000)), dec!(10100));
        assert_eq!(portfolio.equity_at("BTC", dec!(50000)), dec!(10000));
    }

    #[test]
    fn capital_cannot_go_negative() {
        let mut portfolio = Portfolio::new(dec!(100));
        portfolio.open_position(btc_long(dec!(1), dec!(50000))).unwrap();
        let err = portfolio
            .close_position("BTC", dec!(49000), ExitReason::StopLoss, ts(1))
            .unwrap_err();
        assert!(matches!(err, PortfolioError::CapitalExhausted { .. }));
    }

    #[test]
    fn realized_loss_since_ignores_wins_and_older_trades() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.open_position(btc_long(dec!(0.1), dec!(50000))).unwrap();
        portfolio
            .close_position("BTC", dec!(49000), ExitReason::StopLoss, ts(1))
            .unwrap();
        portfolio.open_position(btc_long(dec!(0.1), dec!(49000))).unwrap();
        portfolio
            .close_position("BTC", dec!(50000), ExitReason::TakeProfit, ts(2))
            .unwrap();

        assert_eq!(portfolio.realized_loss_since(ts(0)), dec!(100));
        assert_eq!(portfolio.realized_loss_since(ts(2)), dec!(0));
    }
}
