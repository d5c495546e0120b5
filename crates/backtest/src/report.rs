use crate::engine::BacktestResult;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use senti_trade_core::{EquityPoint, Trade};
use serde::{Deserialize, Serialize};

/// Summary performance metrics for one backtest run.
///
/// Ratios that are undefined for the run (no closed trades, no losing
/// trades, degenerate equity curve) are `None`, which serializes as
/// `null`; NaN never appears in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub final_equity: Decimal,
    /// Fractional return over starting capital.
    pub total_return: Decimal,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: Option<f64>,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub average_win: Option<Decimal>,
    pub average_loss: Option<Decimal>,
    pub profit_factor: Option<f64>,
    /// Largest fractional peak-to-trough equity decline.
    pub max_drawdown: Decimal,
    /// Annualized Sharpe-style ratio over per-bar equity returns.
    pub sharpe_ratio: Option<f64>,
}

/// Reduces a backtest result to summary metrics. Reads only the trade
/// list and equity curve; raw bars are never re-accessed.
#[must_use]
pub fn generate(result: &BacktestResult) -> ReportMetrics {
    let trades = &result.trades;
    let equity_curve = &result.equity_curve;

    let final_equity = equity_curve
        .last()
        .map_or(result.initial_capital, |p| p.equity);
    let total_return = if result.initial_capital > Decimal::ZERO {
        (final_equity - result.initial_capital) / result.initial_capital
    } else {
        Decimal::ZERO
    };

    let wins: Vec<&Trade> = trades.iter().filter(|t| t.pnl > Decimal::ZERO).collect();
    let losses: Vec<&Trade> = trades.iter().filter(|t| t.pnl < Decimal::ZERO).collect();
    let gross_profit: Decimal = wins.iter().map(|t| t.pnl).sum();
    let gross_loss: Decimal = losses.iter().map(|t| -t.pnl).sum();

    #[allow(clippy::cast_precision_loss)]
    let win_rate = if trades.is_empty() {
        None
    } else {
        Some(wins.len() as f64 / trades.len() as f64)
    };

    let average_win = if wins.is_empty() {
        None
    } else {
        Some(gross_profit / Decimal::from(wins.len()))
    };
    let average_loss = if losses.is_empty() {
        None
    } else {
        Some(gross_loss / Decimal::from(losses.len()))
    };

    let profit_factor = if trades.is_empty() || gross_loss == Decimal::ZERO {
        None
    } else {
        (gross_profit / gross_loss).to_f64()
    };

    ReportMetrics {
        final_equity,
        total_return,
        total_trades: trades.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate,
        gross_profit,
        gross_loss,
        average_win,
        average_loss,
        profit_factor,
        max_drawdown: max_drawdown(equity_curve),
        sharpe_ratio: sharpe_ratio(equity_curve, result.timeframe.bars_per_year()),
    }
}

/// Largest fractional peak-to-trough decline on the equity curve.
#[must_use]
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> Decimal {
    let mut max_drawdown = Decimal::ZERO;
    let mut peak = Decimal::ZERO;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - point.equity) / peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }
    max_drawdown
}

/// Annualized mean-over-stddev of per-bar equity returns. `None` when the
/// curve has fewer than two points or zero return variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sharpe_ratio(equity_curve: &[EquityPoint], bars_per_year: f64) -> Option<f64> {
    let equities: Vec<f64> = equity_curve
        .iter()
        .filter_map(|p| p.equity.to_f64())
        .collect();
    if equities.len() < 2 {
        return None;
    }
    let returns: Vec<f64> = equities
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.is_empty() {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return None;
    }
    Some(mean / std_dev * bars_per_year.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BacktestResult, RunStatus};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use senti_trade_core::{Direction, ExitReason, Timeframe};

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(hour)
    }

    fn result_with(trades: Vec<Trade>, equities: Vec<Decimal>) -> BacktestResult {
        BacktestResult {
            symbol: "BTC".to_string(),
            timeframe: Timeframe::H1,
            start: ts(0),
            end: ts(equities.len() as i64),
            initial_capital: dec!(10000),
            status: RunStatus::Completed,
            error: None,
            trades,
            equity_curve: equities
                .into_iter()
                .enumerate()
                .map(|(i, equity)| EquityPoint {
                    timestamp: ts(i as i64),
                    equity,
                })
                .collect(),
            rejections: Vec::new(),
            metrics: None,
        }
    }

    fn trade(pnl: Decimal) -> Trade {
        Trade {
            symbol: "BTC".to_string(),
            direction: Direction::Long,
            size: dec!(0.1),
            entry_price: dec!(50000),
            exit_price: dec!(50000) + pnl / dec!(0.1),
            pnl,
            exit_reason: ExitReason::TakeProfit,
            opened_at: ts(0),
            closed_at: ts(4),
        }
    }

    #[test]
    fn zero_trades_report_undefined_ratios() {
        let metrics = generate(&result_with(Vec::new(), vec![dec!(10000), dec!(10000)]));
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, None);
        assert_eq!(metrics.profit_factor, None);
        assert_eq!(metrics.sharpe_ratio, None);
        assert_eq!(metrics.total_return, dec!(0));
    }

    #[test]
    fn zero_losses_leave_profit_factor_undefined() {
        let metrics = generate(&result_with(
            vec![trade(dec!(100)), trade(dec!(50))],
            vec![dec!(10000), dec!(10100), dec!(10150)],
        ));
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 0);
        assert_eq!(metrics.profit_factor, None);
        assert_eq!(metrics.average_loss, None);
        assert_eq!(metrics.win_rate, Some(1.0));
    }

    #[test]
    fn mixed_trades_compute_everything() {
        let metrics = generate(&result_with(
            vec![trade(dec!(300)), trade(dec!(-100)), trade(dec!(-50))],
            vec![dec!(10000), dec!(10300), dec!(10200), dec!(10150)],
        ));
        assert_eq!(metrics.gross_profit, dec!(300));
        assert_eq!(metrics.gross_loss, dec!(150));
        assert!((metrics.profit_factor.unwrap() - 2.0).abs() < 1e-9);
        assert!((metrics.win_rate.unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.average_win, Some(dec!(300)));
        assert_eq!(metrics.average_loss, Some(dec!(75)));
        assert_eq!(metrics.final_equity, dec!(10150));
        assert_eq!(metrics.total_return, dec!(0.015));
    }

    #[test]
    fn drawdown_is_peak_to_trough() {
        let curve: Vec<EquityPoint> = [10000, 12000, 9000, 11000, 8000]
            .iter()
            .enumerate()
            .map(|(i, e)| EquityPoint {
                timestamp: ts(i as i64),
                equity: Decimal::from(*e),
            })
            .collect();
        // Worst decline: 12000 → 8000.
        assert_eq!(max_drawdown(&curve), dec!(4000) / dec!(12000));
    }

    #[test]
    fn flat_curve_has_no_sharpe() {
        let curve: Vec<EquityPoint> = (0..10)
            .map(|i| EquityPoint {
                timestamp: ts(i),
                equity: dec!(10000),
            })
            .collect();
        assert_eq!(sharpe_ratio(&curve, 8760.0), None);
        assert_eq!(max_drawdown(&curve), dec!(0));
    }
}
