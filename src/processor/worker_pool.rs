//! Worker pool orchestration for `MessageMover`.
//!
//! Creates one queue client per worker, launches the workers, routes worker
//! errors and panics to the fatal handler, and joins them.

use crate::queue::client::{QueueClient, QueueClientFactory};
use crate::runtime::fatal::FatalErrorHandler;
use crate::worker::{Worker, WorkerExit, WorkerShared};
use anyhow::{Context, Result};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) struct WorkerPool {
    client_count: usize,
    factory: Arc<dyn QueueClientFactory>,
    workers: Vec<JoinHandle<Option<WorkerExit>>>,
}

impl WorkerPool {
    pub(crate) fn new(client_count: usize, factory: Arc<dyn QueueClientFactory>) -> Self {
        Self {
            client_count: client_count.max(1),
            factory,
            workers: Vec::new(),
        }
    }

    /// Spawns every worker. Clients are all created up front so a factory failure
    /// leaves nothing running.
    pub(crate) fn launch(
        &mut self,
        shared: WorkerShared,
        run_token: CancellationToken,
        fatal_handler: Arc<FatalErrorHandler>,
    ) -> Result<()> {
        let clients = (0..self.client_count)
            .map(|worker_id| {
                self.factory
                    .create(worker_id)
                    .with_context(|| format!("failed to create queue client for worker {worker_id}"))
            })
            .collect::<Result<Vec<Arc<dyn QueueClient>>>>()?;

        for (worker_id, client) in clients.into_iter().enumerate() {
            let worker = Worker::new(worker_id, client, shared.clone(), run_token.clone());
            let fatal_handler = fatal_handler.clone();

            let handle = tokio::spawn(async move {
                let result = std::panic::AssertUnwindSafe(worker.run())
                    .catch_unwind()
                    .await;

                match result {
                    Ok(Ok(exit)) => Some(exit),
                    Ok(Err(err)) => {
                        tracing::error!(
                            worker = worker_id,
                            error = %err,
                            "worker task exited with error"
                        );
                        let context = format!("worker {worker_id} exited with error");
                        fatal_handler.trigger(context.as_str(), err.context(context.clone()));
                        None
                    }
                    Err(panic_payload) => {
                        let panic_msg = panic_message(panic_payload.as_ref());
                        tracing::error!(
                            worker = worker_id,
                            panic = %panic_msg,
                            "worker task panicked"
                        );
                        let context = format!("worker {worker_id} panicked");
                        let panic_error =
                            anyhow::anyhow!("worker {worker_id} panicked: {panic_msg}");
                        fatal_handler.trigger(context.as_str(), panic_error);
                        None
                    }
                }
            });

            self.workers.push(handle);
        }

        Ok(())
    }

    /// Waits for every launched worker. Workers that failed report `None`.
    pub(crate) async fn join(&mut self) -> Vec<Option<WorkerExit>> {
        let handles = std::mem::take(&mut self.workers);
        join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(worker_id, result)| match result {
                Ok(exit) => exit,
                Err(err) => {
                    tracing::warn!(worker = worker_id, error = %err, "worker task terminated unexpectedly");
                    None
                }
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
