pub mod config;
pub mod config_loader;
pub mod error;
pub mod market;
pub mod portfolio;
pub mod position;
pub mod sentiment;
pub mod signal;

pub use config::{
    AppConfig, BacktestConfig, EntryFill, FusionConfig, IndicatorConfig, LiveConfig, RiskConfig,
};
pub use config_loader::ConfigLoader;
pub use error::MarketDataError;
pub use market::{PriceBar, Timeframe};
pub use portfolio::{EquityPoint, Portfolio, PortfolioError};
pub use position::{ExitReason, Position, Trade};
pub use sentiment::{SentimentScore, SourceContribution};
pub use signal::{Direction, OrderIntent, Signal, SignalDirection};
