use chrono::{DateTime, Utc};
use senti_trade_core::Signal;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Control messages for a symbol worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Start,
    Stop,
    GetStatus(oneshot::Sender<WorkerStatus>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Stopped,
    Running,
}

/// Point-in-time view of a worker, served over the command channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub symbol: String,
    pub state: WorkerState,
    /// When the last poll cycle finished, whatever its outcome.
    pub last_cycle: Option<DateTime<Utc>>,
    pub last_signal: Option<Signal>,
    /// Error from the most recent cycle, cleared by the next clean one.
    pub error: Option<String>,
}
