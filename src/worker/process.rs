use crate::queue::client::QueueClient;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::shared::WorkerShared;
use super::types::{EmptyFetchTracker, WorkerExit};

pub struct Worker {
    pub id: usize,
    pub(super) client: Arc<dyn QueueClient>,
    pub(super) shared: WorkerShared,
    pub(super) shutdown: CancellationToken,
    pub(super) empty_fetches: EmptyFetchTracker,
}

impl Worker {
    pub fn new(
        id: usize,
        client: Arc<dyn QueueClient>,
        shared: WorkerShared,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            client,
            shared,
            shutdown,
            empty_fetches: EmptyFetchTracker::new(),
        }
    }

    /// Drains the source queue until it looks exhausted, the limit is reached or the
    /// run is cancelled. A receive error ends the worker with that error.
    #[tracing::instrument(name = "worker", skip_all, fields(worker = self.id))]
    pub async fn run(mut self) -> Result<WorkerExit> {
        tracing::debug!(worker = self.id, "worker task started");
        self.shared.telemetry.worker_started();
        let exit = self.drain().await;
        self.shared.telemetry.worker_finished();
        exit
    }

    async fn drain(&mut self) -> Result<WorkerExit> {
        let ctx = self.shared.transfer_context(Arc::clone(&self.client));

        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!(worker = self.id, "shutdown requested; exiting worker loop");
                return Ok(WorkerExit::Cancelled);
            }

            if ctx.limit_reached() {
                self.log_limit_reached();
                return Ok(WorkerExit::LimitReached);
            }

            let Some(messages) = self.fetch_batch().await? else {
                tracing::info!(worker = self.id, "shutdown requested while fetching");
                return Ok(WorkerExit::Cancelled);
            };

            if self.empty_fetches.observe(messages.len()) {
                tracing::info!(worker = self.id, "source queue drained");
                return Ok(WorkerExit::Drained);
            }

            if ctx.limit_reached() {
                self.log_limit_reached();
                return Ok(WorkerExit::LimitReached);
            }

            if messages.is_empty() {
                tracing::debug!(worker = self.id, "received no messages");
                continue;
            }

            tracing::info!(
                worker = self.id,
                messages = messages.len(),
                "received messages"
            );

            let report = self.dispatch_batch(&ctx, messages).await?;
            tracing::debug!(
                worker = self.id,
                moved = report.forwarded(),
                filtered = report.filtered,
                send_failed = report.send_failed,
                "batch complete"
            );
        }
    }

    fn log_limit_reached(&self) {
        tracing::info!(
            worker = self.id,
            moved = self.shared.moved.moved(),
            limit = %self.shared.limit,
            "transfer limit reached"
        );
    }
}
