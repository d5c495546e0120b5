//! Deterministic bar-replay backtesting.
//!
//! The simulator walks historical bars strictly in order, so every
//! decision is made with the information available at that bar and two
//! runs over the same inputs produce identical results.

pub mod engine;
pub mod fill;
pub mod report;

pub use engine::{Backtester, BacktestResult, RejectionRecord, RunState, RunStatus};
pub use fill::FillSimulator;
pub use report::{generate, max_drawdown, sharpe_ratio, ReportMetrics};
