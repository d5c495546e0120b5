use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use senti_trade_backtest::{Backtester, RunStatus};
use senti_trade_core::{AppConfig, ConfigLoader, Timeframe};
use senti_trade_data::{CsvBarStore, CsvSentimentStore, MarketData, SentimentFeed};
use senti_trade_orchestrator::WorkerRegistry;
use senti_trade_signals::SignalEngine;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "senti-trade")]
#[command(about = "Signal fusion, risk management, and backtesting engine", long_about = None)]
struct Cli {
    /// Config profile overlay (config/Config.<profile>.toml)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay historical bars and print the run report as JSON
    Backtest {
        /// Historical bar CSV (timestamp,symbol,open,high,low,close,volume)
        #[arg(short, long)]
        data: String,
        /// Sentiment CSV (timestamp,symbol,compound); omit for technical-only
        #[arg(long)]
        sentiment: Option<String>,
        /// Symbol to replay
        #[arg(short, long)]
        symbol: String,
        /// Bar interval (1m, 5m, 15m, 1h, 4h, 1d)
        #[arg(short, long, default_value = "1h")]
        timeframe: String,
        /// Start of the replay window, ISO 8601 (e.g. 2024-01-01T00:00:00Z)
        #[arg(long)]
        start: String,
        /// End of the replay window, ISO 8601
        #[arg(long)]
        end: String,
        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compute the fused signal for one symbol at a point in time
    Signal {
        /// Historical bar CSV
        #[arg(short, long)]
        data: String,
        /// Sentiment CSV; omit for technical-only
        #[arg(long)]
        sentiment: Option<String>,
        /// Symbol to evaluate
        #[arg(short, long)]
        symbol: String,
        /// Bar interval (1m, 5m, 15m, 1h, 4h, 1d)
        #[arg(short, long, default_value = "1h")]
        timeframe: String,
        /// Decision time, ISO 8601; defaults to now
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Run live paper-trading workers for the configured symbols
    Run {
        /// Historical bar CSV serving as the market data source
        #[arg(short, long)]
        data: String,
        /// Sentiment CSV; omit for technical-only
        #[arg(long)]
        sentiment: Option<String>,
        /// Bar interval (1m, 5m, 15m, 1h, 4h, 1d)
        #[arg(short, long, default_value = "1h")]
        timeframe: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match cli.profile.as_deref() {
        Some(profile) => ConfigLoader::load_with_profile(profile)?,
        None => ConfigLoader::load()?,
    };

    match cli.command {
        Commands::Backtest {
            data,
            sentiment,
            symbol,
            timeframe,
            start,
            end,
            output,
        } => {
            run_backtest(
                &config, &data, sentiment.as_deref(), &symbol, &timeframe, &start, &end,
                output.as_deref(),
            )
            .await
        }
        Commands::Signal {
            data,
            sentiment,
            symbol,
            timeframe,
            as_of,
        } => {
            run_signal(
                &config, &data, sentiment.as_deref(), &symbol, &timeframe,
                as_of.as_deref(),
            )
            .await
        }
        Commands::Run {
            data,
            sentiment,
            timeframe,
        } => run_live(config, &data, sentiment.as_deref(), &timeframe).await,
    }
}

fn load_stores(
    data: &str,
    sentiment: Option<&str>,
    timeframe: Timeframe,
) -> Result<(Arc<dyn MarketData>, Arc<dyn SentimentFeed>)> {
    let bars = CsvBarStore::from_csv(data, timeframe)
        .with_context(|| format!("loading bars from {data}"))?;
    let scores = match sentiment {
        Some(path) => CsvSentimentStore::from_csv(path)
            .with_context(|| format!("loading sentiment from {path}"))?,
        None => CsvSentimentStore::empty(),
    };
    Ok((Arc::new(bars), Arc::new(scores)))
}

fn parse_instant(value: &str, what: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .with_context(|| format!("invalid {what} '{value}' (expected ISO 8601)"))
}

#[allow(clippy::too_many_arguments)]
async fn run_backtest(
    config: &AppConfig,
    data: &str,
    sentiment: Option<&str>,
    symbol: &str,
    timeframe: &str,
    start: &str,
    end: &str,
    output: Option<&str>,
) -> Result<()> {
    let timeframe: Timeframe = timeframe.parse()?;
    let start = parse_instant(start, "start")?;
    let end = parse_instant(end, "end")?;
    let (market, scores) = load_stores(data, sentiment, timeframe)?;

    let backtester = Backtester::new(market, scores, config.clone());
    let result = backtester.run(symbol, timeframe, start, end).await;

    let report = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, &report).with_context(|| format!("writing report to {path}"))?;
            tracing::info!(path, "report written");
        }
        None => println!("{report}"),
    }

    if result.status == RunStatus::Failed {
        anyhow::bail!(
            "backtest failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

async fn run_signal(
    config: &AppConfig,
    data: &str,
    sentiment: Option<&str>,
    symbol: &str,
    timeframe: &str,
    as_of: Option<&str>,
) -> Result<()> {
    let timeframe: Timeframe = timeframe.parse()?;
    let as_of = match as_of {
        Some(value) => parse_instant(value, "as_of")?,
        None => Utc::now(),
    };
    let (market, scores) = load_stores(data, sentiment, timeframe)?;

    let engine = SignalEngine::new(market, scores, config);
    let signal = engine.compute_signal(symbol, timeframe, as_of).await?;
    println!("{}", serde_json::to_string_pretty(&signal)?);
    Ok(())
}

async fn run_live(
    config: AppConfig,
    data: &str,
    sentiment: Option<&str>,
    timeframe: &str,
) -> Result<()> {
    let timeframe: Timeframe = timeframe.parse()?;
    let (market, scores) = load_stores(data, sentiment, timeframe)?;

    let registry = WorkerRegistry::new(config);
    let handles = registry.spawn_all(timeframe, market, scores).await?;
    tracing::info!(workers = handles.len(), "live session starting");
    registry.start_all().await?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down workers");
    registry.shutdown_all().await?;

    let book = registry.portfolio();
    let book = book.lock().await;
    tracing::info!(
        capital = %book.capital(),
        trades = book.trades().len(),
        "session closed"
    );
    Ok(())
}
