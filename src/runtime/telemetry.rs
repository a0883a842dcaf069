use crate::transfer::limit::MovedCounter;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Rolling counters describing what the workers did with the messages they fetched.
///
/// These never gate behaviour; the moved count that enforces the limit lives in
/// [`MovedCounter`].
#[derive(Default, Debug)]
pub struct Telemetry {
    fetches: AtomicU64,
    empty_fetches: AtomicU64,
    received_messages: AtomicU64,
    filtered_messages: AtomicU64,
    limit_skips: AtomicU64,
    send_failures: AtomicU64,
    delete_failures: AtomicU64,
    active_workers: AtomicUsize,
}

impl Telemetry {
    pub fn record_fetch(&self, received: usize) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if received == 0 {
            self.empty_fetches.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.received_messages
            .fetch_add(received as u64, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.filtered_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_limit_skip(&self) {
        self.limit_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete_failure(&self) {
        self.delete_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_finished(&self) {
        let _ = self
            .active_workers
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(1))
            });
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            empty_fetches: self.empty_fetches.load(Ordering::Relaxed),
            received_messages: self.received_messages.load(Ordering::Relaxed),
            filtered_messages: self.filtered_messages.load(Ordering::Relaxed),
            limit_skips: self.limit_skips.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    pub fetches: u64,
    pub empty_fetches: u64,
    pub received_messages: u64,
    pub filtered_messages: u64,
    pub limit_skips: u64,
    pub send_failures: u64,
    pub delete_failures: u64,
}

/// Spawns a background task that periodically logs throughput and failure counters.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    moved: Arc<MovedCounter>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_moved = moved.moved();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(target: "sqsmv::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_moved = moved.moved();
                    let moved_delta = current_moved.saturating_sub(last_moved);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        moved_delta as f64 / elapsed
                    };
                    let snapshot = telemetry.snapshot();

                    tracing::info!(
                        target: "sqsmv::metrics",
                        throughput = format!("{throughput:.2}"),
                        moved = current_moved,
                        received = snapshot.received_messages,
                        filtered = snapshot.filtered_messages,
                        send_failures = snapshot.send_failures,
                        delete_failures = snapshot.delete_failures,
                        active_workers = telemetry.active_workers(),
                        "runtime metrics snapshot"
                    );

                    last_moved = current_moved;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
