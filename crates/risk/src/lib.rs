pub mod manager;

pub use manager::{start_of_utc_day, RejectReason, RiskDecision, RiskManager};
