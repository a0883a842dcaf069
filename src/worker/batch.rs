use crate::queue::message::Message;
use crate::transfer::pipeline::{transfer_message, TransferContext};
use anyhow::{anyhow, Context, Result};
use tokio::task::JoinSet;

use super::process::Worker;
use super::types::BatchReport;

impl Worker {
    /// Fetches one batch from the source. Returns `None` when the run is cancelled
    /// before the receive call completes.
    pub(super) async fn fetch_batch(&self) -> Result<Option<Vec<Message>>> {
        let receive = self
            .client
            .receive(&self.shared.source, &self.shared.receive_options);

        let messages = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Ok(None),
            result = receive => result.with_context(|| {
                format!(
                    "worker {} failed to receive messages from {}",
                    self.id, self.shared.source
                )
            })?,
        };

        self.shared.telemetry.record_fetch(messages.len());
        Ok(Some(messages))
    }

    /// Runs the pipeline for every message concurrently and waits for all of them.
    ///
    /// Tasks are never aborted; a panicking pipeline task is reported once the
    /// remaining tasks of the batch have finished.
    pub(super) async fn dispatch_batch(
        &self,
        ctx: &TransferContext,
        messages: Vec<Message>,
    ) -> Result<BatchReport> {
        let mut tasks = JoinSet::new();
        for message in messages {
            let ctx = ctx.clone();
            let worker_id = self.id;
            tasks.spawn(async move { transfer_message(&ctx, worker_id, message).await });
        }

        let mut report = BatchReport::default();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    tracing::error!(worker = self.id, error = %err, "pipeline task failed");
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            Some(err) => Err(anyhow!("worker {} pipeline task failed: {err}", self.id)),
            None => Ok(report),
        }
    }
}
