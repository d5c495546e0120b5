//! Live-mode orchestration: one polling actor per symbol, all trading
//! against one shared paper portfolio.

pub mod commands;
pub mod handle;
pub mod registry;
pub mod worker;

pub use commands::{WorkerCommand, WorkerState, WorkerStatus};
pub use handle::WorkerHandle;
pub use registry::WorkerRegistry;
pub use worker::SymbolWorker;
