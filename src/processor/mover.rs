//! Coordinator for one transfer run: builds the shared state, launches the
//! worker pool, waits for every worker and reports what happened.

use super::lifecycle::{LifecycleHandles, LifecycleSpawnParams};
use super::worker_pool::WorkerPool;
use crate::queue::client::QueueClientFactory;
use crate::runtime::config::MoverConfig;
use crate::runtime::telemetry::{Telemetry, TelemetrySnapshot};
use crate::transfer::limit::MovedCounter;
use crate::worker::{WorkerExit, WorkerShared, WorkerSharedParams};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Final accounting of a transfer run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSummary {
    pub moved: u64,
    pub received: u64,
    pub filtered: u64,
    pub skipped_for_limit: u64,
    pub send_failures: u64,
    pub delete_failures: u64,
    pub fetches: u64,
    pub empty_fetches: u64,
    pub workers: usize,
    /// True when the run was cancelled before every worker finished on its own.
    pub interrupted: bool,
    pub elapsed_secs: f64,
}

impl TransferSummary {
    fn new(
        moved: u64,
        telemetry: TelemetrySnapshot,
        exits: &[Option<WorkerExit>],
        elapsed: Duration,
    ) -> Self {
        Self {
            moved,
            received: telemetry.received_messages,
            filtered: telemetry.filtered_messages,
            skipped_for_limit: telemetry.limit_skips,
            send_failures: telemetry.send_failures,
            delete_failures: telemetry.delete_failures,
            fetches: telemetry.fetches,
            empty_fetches: telemetry.empty_fetches,
            workers: exits.len(),
            interrupted: exits
                .iter()
                .any(|exit| matches!(exit, Some(WorkerExit::Cancelled) | None)),
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

/// Moves messages from the configured source queue to the destination queue
/// with `client_count` concurrent workers.
pub struct MessageMover {
    config: MoverConfig,
    factory: Arc<dyn QueueClientFactory>,
    shutdown_root: CancellationToken,
}

impl MessageMover {
    pub fn new(config: MoverConfig, factory: Arc<dyn QueueClientFactory>) -> Self {
        Self::with_cancellation_token(config, factory, CancellationToken::new())
    }

    /// Uses `shutdown_root` as the parent of every run token, so cancelling it stops
    /// the workers after their current batch.
    pub fn with_cancellation_token(
        config: MoverConfig,
        factory: Arc<dyn QueueClientFactory>,
        shutdown_root: CancellationToken,
    ) -> Self {
        Self {
            config,
            factory,
            shutdown_root,
        }
    }

    pub fn config(&self) -> &MoverConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown_root.clone()
    }

    /// Runs every worker to completion and returns the final summary.
    ///
    /// The first worker error (or panic) cancels the run and is returned instead.
    pub async fn run(&self) -> Result<TransferSummary> {
        self.run_inner()
            .await
            .context("message transfer aborted")
    }

    async fn run_inner(&self) -> Result<TransferSummary> {
        debug_assert!(
            self.config.validate().is_ok(),
            "MoverConfig should have been validated at construction time"
        );

        let started = Instant::now();
        let filter = Arc::new(self.config.filter()?);
        let moved = Arc::new(MovedCounter::new());
        let telemetry = Arc::new(Telemetry::default());

        tracing::info!(
            source = self.config.source_queue(),
            destination = self.config.destination_queue(),
            clients = self.config.client_count(),
            limit = %self.config.limit(),
            include = self.config.include_pattern(),
            "starting message transfer"
        );

        let lifecycle = LifecycleHandles::spawn(LifecycleSpawnParams {
            shutdown_root: &self.shutdown_root,
            telemetry: telemetry.clone(),
            moved: moved.clone(),
            metrics_interval: self.config.metrics_interval(),
        });

        let shared = WorkerShared::new(WorkerSharedParams {
            source: self.config.source_queue().to_owned(),
            destination: self.config.destination_queue().to_owned(),
            filter,
            limit: self.config.limit(),
            moved: moved.clone(),
            telemetry: telemetry.clone(),
            receive_options: self.config.receive_options(),
        });

        let mut pool = WorkerPool::new(self.config.client_count(), self.factory.clone());
        if let Err(err) = pool.launch(
            shared,
            lifecycle.run_token.clone(),
            lifecycle.fatal_handler(),
        ) {
            lifecycle.shutdown().await;
            return Err(err);
        }

        let exits = pool.join().await;
        tracing::debug!("message transfer: worker tasks joined");

        let fatal = lifecycle.error();
        lifecycle.shutdown().await;
        if let Some(err) = fatal {
            return Err(err);
        }

        let summary = TransferSummary::new(
            moved.moved(),
            telemetry.snapshot(),
            &exits,
            started.elapsed(),
        );
        tracing::info!(
            moved = summary.moved,
            filtered = summary.filtered,
            send_failures = summary.send_failures,
            delete_failures = summary.delete_failures,
            interrupted = summary.interrupted,
            "message transfer finished"
        );
        Ok(summary)
    }
}
