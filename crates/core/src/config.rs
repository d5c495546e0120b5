use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
///
/// Every numeric parameter referenced by the engine lives here with a
/// documented default; nothing is hard-coded in the components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Symbols the live workers track.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub live: LiveConfig,
}

fn default_symbols() -> Vec<String> {
    ["BTC", "ETH", "BNB", "XRP", "ADA"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            indicators: IndicatorConfig::default(),
            fusion: FusionConfig::default(),
            risk: RiskConfig::default(),
            backtest: BacktestConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

/// Indicator periods and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,
    /// Band width as a multiple of the rolling standard deviation.
    #[serde(default = "default_bollinger_mult")]
    pub bollinger_mult: f64,
    #[serde(default = "default_ema_fast")]
    pub ema_fast: usize,
    #[serde(default = "default_ema_slow")]
    pub ema_slow: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// Window for pivot-based support/resistance levels.
    #[serde(default = "default_pivot_window")]
    pub pivot_window: usize,
    /// Number of equal price buckets in the volume profile.
    #[serde(default = "default_volume_bins")]
    pub volume_bins: usize,
}

const fn default_rsi_period() -> usize {
    14
}
const fn default_macd_fast() -> usize {
    12
}
const fn default_macd_slow() -> usize {
    26
}
const fn default_macd_signal() -> usize {
    9
}
const fn default_bollinger_period() -> usize {
    20
}
const fn default_bollinger_mult() -> f64 {
    2.0
}
const fn default_ema_fast() -> usize {
    50
}
const fn default_ema_slow() -> usize {
    200
}
const fn default_atr_period() -> usize {
    14
}
const fn default_pivot_window() -> usize {
    20
}
const fn default_volume_bins() -> usize {
    10
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            bollinger_period: default_bollinger_period(),
            bollinger_mult: default_bollinger_mult(),
            ema_fast: default_ema_fast(),
            ema_slow: default_ema_slow(),
            atr_period: default_atr_period(),
            pivot_window: default_pivot_window(),
            volume_bins: default_volume_bins(),
        }
    }
}

/// Signal fusion weights and thresholds.
///
/// The technical/sentiment split and the per-indicator weights are
/// deliberately configuration, not constants; the shipped defaults follow
/// the upstream collectors (60/40 blend, 0.2 entry threshold, 24h
/// sentiment window).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "default_indicator_weight")]
    pub rsi_weight: f64,
    #[serde(default = "default_indicator_weight")]
    pub macd_weight: f64,
    #[serde(default = "default_indicator_weight")]
    pub bollinger_weight: f64,
    #[serde(default = "default_indicator_weight")]
    pub ema_weight: f64,
    /// Weight of the technical sub-score in the final blend.
    #[serde(default = "default_technical_weight")]
    pub technical_weight: f64,
    /// Weight of the sentiment sub-score in the final blend. Redistributed
    /// to technical when no sentiment has ever been seen for a symbol.
    #[serde(default = "default_sentiment_weight")]
    pub sentiment_weight: f64,
    /// Blend magnitude required before a signal is directional. A blend at
    /// exactly the threshold stays flat.
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: f64,
    /// Sentiment age (hours) after which the score starts decaying toward
    /// zero; fully decayed at twice this window.
    #[serde(default = "default_sentiment_window_hours")]
    pub sentiment_window_hours: i64,
}

const fn default_indicator_weight() -> f64 {
    1.0
}
const fn default_technical_weight() -> f64 {
    0.6
}
const fn default_sentiment_weight() -> f64 {
    0.4
}
const fn default_entry_threshold() -> f64 {
    0.2
}
const fn default_sentiment_window_hours() -> i64 {
    24
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rsi_weight: default_indicator_weight(),
            macd_weight: default_indicator_weight(),
            bollinger_weight: default_indicator_weight(),
            ema_weight: default_indicator_weight(),
            technical_weight: default_technical_weight(),
            sentiment_weight: default_sentiment_weight(),
            entry_threshold: default_entry_threshold(),
            sentiment_window_hours: default_sentiment_window_hours(),
        }
    }
}

/// Risk limits, all expressed as fractions of capital/equity in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of capital put at risk between entry and stop per trade.
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade_pct: f64,
    /// Maximum single-position notional as a fraction of capital.
    #[serde(default = "default_max_position")]
    pub max_position_pct: f64,
    /// Maximum aggregate open notional as a fraction of equity.
    #[serde(default = "default_max_exposure")]
    pub max_exposure_pct: f64,
    /// Realized losses per UTC day before new entries are refused.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss_pct: f64,
    /// Stop distance as a multiple of ATR when the signal carries no stop.
    #[serde(default = "default_atr_stop_multiple")]
    pub atr_stop_multiple: f64,
    /// Take-profit distance as a multiple of the stop distance.
    #[serde(default = "default_reward_ratio")]
    pub reward_ratio: f64,
}

const fn default_risk_per_trade() -> f64 {
    0.01
}
const fn default_max_position() -> f64 {
    0.10
}
const fn default_max_exposure() -> f64 {
    0.50
}
const fn default_max_daily_loss() -> f64 {
    0.02
}
const fn default_atr_stop_multiple() -> f64 {
    2.0
}
const fn default_reward_ratio() -> f64 {
    2.0
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: default_risk_per_trade(),
            max_position_pct: default_max_position(),
            max_exposure_pct: default_max_exposure(),
            max_daily_loss_pct: default_max_daily_loss(),
            atr_stop_multiple: default_atr_stop_multiple(),
            reward_ratio: default_reward_ratio(),
        }
    }
}

/// When an admitted entry is filled during a backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFill {
    /// Fill at the close of the bar that produced the signal.
    #[default]
    Close,
    /// Fill at the open of the following bar.
    NextOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,
    #[serde(default)]
    pub entry_fill: EntryFill,
    /// Simulated slippage applied to fills, in basis points.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: f64,
    /// Commission charged on fill notional, as a fraction.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    /// A timestamp step larger than this many bar intervals fails the run.
    #[serde(default = "default_max_gap_intervals")]
    pub max_gap_intervals: u32,
}

fn default_initial_capital() -> Decimal {
    Decimal::from(10_000)
}
const fn default_slippage_bps() -> f64 {
    10.0
}
const fn default_commission_rate() -> f64 {
    0.001
}
const fn default_max_gap_intervals() -> u32 {
    3
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            entry_fill: EntryFill::default(),
            slippage_bps: default_slippage_bps(),
            commission_rate: default_commission_rate(),
            max_gap_intervals: default_max_gap_intervals(),
        }
    }
}

/// Live worker scheduling and collaborator retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Attempts against a collaborator before the cycle is skipped.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff between attempts; doubles per retry.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    /// Bars of history fetched per poll for indicator warmup.
    #[serde(default = "default_warmup_bars")]
    pub warmup_bars: usize,
}

const fn default_poll_interval_secs() -> u64 {
    300
}
const fn default_max_retries() -> u32 {
    3
}
const fn default_retry_backoff_secs() -> u64 {
    2
}
const fn default_warmup_bars() -> usize {
    250
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
            warmup_bars: default_warmup_bars(),
        }
    }
}
