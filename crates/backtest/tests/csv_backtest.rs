//! End-to-end run: CSV files on disk through the stores, the replay, and
//! the serialized report.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use senti_trade_backtest::{BacktestResult, Backtester, RunStatus};
use senti_trade_core::{AppConfig, FusionConfig, IndicatorConfig, Timeframe};
use senti_trade_data::{CsvBarStore, CsvSentimentStore};
use std::io::Write;
use std::sync::Arc;

fn hour(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(i)
}

fn write_fixtures() -> (tempfile::NamedTempFile, tempfile::NamedTempFile) {
    let mut bars = tempfile::NamedTempFile::new().unwrap();
    writeln!(bars, "timestamp,symbol,open,high,low,close,volume").unwrap();
    for i in 0..60i64 {
        let close = 1000 - i;
        writeln!(
            bars,
            "{},BTC,{},{},{},{},5",
            hour(i).to_rfc3339(),
            close + 1,
            close + 1,
            close - 1,
            close
        )
        .unwrap();
    }

    let mut sentiment = tempfile::NamedTempFile::new().unwrap();
    writeln!(sentiment, "timestamp,symbol,compound").unwrap();
    writeln!(sentiment, "{},BTC,-0.5", hour(0).to_rfc3339()).unwrap();

    (bars, sentiment)
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.indicators = IndicatorConfig {
        rsi_period: 2,
        macd_fast: 2,
        macd_slow: 3,
        macd_signal: 2,
        bollinger_period: 2,
        bollinger_mult: 2.0,
        ema_fast: 2,
        ema_slow: 3,
        atr_period: 2,
        pivot_window: 3,
        volume_bins: 4,
    };
    config.fusion = FusionConfig {
        rsi_weight: 1.0,
        macd_weight: 0.0,
        bollinger_weight: 0.0,
        ema_weight: 0.0,
        entry_threshold: 0.1,
        ..FusionConfig::default()
    };
    config.backtest.slippage_bps = 0.0;
    config.backtest.commission_rate = 0.0;
    config
}

#[tokio::test]
async fn csv_files_replay_to_a_serializable_report() {
    let (bar_file, sentiment_file) = write_fixtures();
    let market = CsvBarStore::from_csv(bar_file.path(), Timeframe::H1).unwrap();
    let sentiment = CsvSentimentStore::from_csv(sentiment_file.path()).unwrap();

    let backtester = Backtester::new(Arc::new(market), Arc::new(sentiment), config());
    let result = backtester
        .run("BTC", Timeframe::H1, hour(0), hour(59))
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.equity_curve.len(), 60);
    assert!(!result.trades.is_empty());
    let metrics = result.metrics.as_ref().unwrap();
    let realized = result.trades.iter().map(|t| t.pnl).sum::<rust_decimal::Decimal>();
    assert_eq!(metrics.final_equity, dec!(10000) + realized);

    let json = serde_json::to_string(&result).unwrap();
    let parsed: BacktestResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, result);
}
