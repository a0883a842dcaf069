use crate::processor::mover::{MessageMover, TransferSummary};
use crate::queue::client::QueueClientFactory;
use crate::runtime::config::MoverConfig;
use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Drives a [`MessageMover`] and handles OS signals for graceful shutdowns.
pub struct Runner {
    mover: MessageMover,
    shutdown: CancellationToken,
}

impl Runner {
    /// Creates a new runner and wires a root [`CancellationToken`] that propagates
    /// through every worker of the transfer.
    pub fn new(config: MoverConfig, factory: Arc<dyn QueueClientFactory>) -> Self {
        let shutdown = CancellationToken::new();
        let mover = MessageMover::with_cancellation_token(config, factory, shutdown.clone());
        Self { mover, shutdown }
    }

    /// Returns a clone of the root shutdown token so external callers can integrate
    /// with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn mover(&self) -> &MessageMover {
        &self.mover
    }

    /// Runs the transfer to completion without installing a signal handler.
    pub async fn run(&self) -> Result<TransferSummary> {
        self.mover.run().await
    }

    /// Runs the transfer; a Ctrl-C (SIGINT) cancels the root token and the workers
    /// stop after the batch they are processing.
    pub async fn run_until_ctrl_c(&self) -> Result<TransferSummary> {
        let transfer = self.mover.run();
        tokio::pin!(transfer);

        tokio::select! {
            result = &mut transfer => return result,
            signal = signal::ctrl_c() => match signal {
                Ok(()) => {
                    tracing::info!("Ctrl-C received; stopping workers after their current batch");
                    self.shutdown.cancel();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to listen for Ctrl-C; running transfer to completion");
                }
            },
        }

        transfer.await
    }
}
