pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod levels;
pub mod macd;
pub mod rsi;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerValue};
pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorSnapshot};
pub use levels::{volume_profile, PivotLevels, SupportResistance, VolumeBucket};
pub use macd::{Macd, MacdValue};
pub use rsi::Rsi;
