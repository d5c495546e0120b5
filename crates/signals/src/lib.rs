pub mod engine;
pub mod fusion;
pub mod technical;

pub use engine::{Observation, SignalEngine};
pub use fusion::SignalFusion;
pub use technical::{bollinger_tilt, ema_tilt, macd_tilt, rsi_tilt, technical_score};
