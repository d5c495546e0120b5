use crate::commands::{WorkerCommand, WorkerStatus};
use anyhow::Result;
use tokio::sync::{mpsc, oneshot};

/// Cloneable control handle for one symbol worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerCommand>,
}

impl WorkerHandle {
    #[must_use]
    pub const fn new(tx: mpsc::Sender<WorkerCommand>) -> Self {
        Self { tx }
    }

    /// # Errors
    /// Returns an error if the worker's command channel is closed.
    pub async fn start(&self) -> Result<()> {
        self.tx.send(WorkerCommand::Start).await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the worker's command channel is closed.
    pub async fn stop(&self) -> Result<()> {
        self.tx.send(WorkerCommand::Stop).await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the command cannot be sent or the worker drops
    /// the reply channel.
    pub async fn status(&self) -> Result<WorkerStatus> {
        let (reply, response) = oneshot::channel();
        self.tx.send(WorkerCommand::GetStatus(reply)).await?;
        Ok(response.await?)
    }

    /// # Errors
    /// Returns an error if the worker's command channel is closed.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(WorkerCommand::Shutdown).await?;
        Ok(())
    }
}
