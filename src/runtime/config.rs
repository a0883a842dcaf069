use crate::queue::options::{ReceiveOptions, MAX_VISIBILITY_TIMEOUT};
use crate::runtime::telemetry;
use crate::transfer::filter::Filter;
use crate::transfer::limit::TransferLimit;
use anyhow::{bail, Context, Result};
use std::time::Duration;

const DEFAULT_CLIENT_COUNT: usize = 1;
const DEFAULT_FILTER_VISIBILITY_TIMEOUT_SECS: u64 = 120;

/// Runtime configuration for a message transfer.
///
/// All instances must be constructed via [`MoverConfig::builder`] or [`MoverConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoverConfig {
    source_queue: String,
    destination_queue: String,
    client_count: usize,
    limit: TransferLimit,
    include_pattern: String,
    metrics_interval: Duration,
    filter_visibility_timeout: Duration,
}

pub struct MoverConfigParams {
    pub source_queue: String,
    pub destination_queue: String,
    pub client_count: usize,
    pub limit: TransferLimit,
    pub include_pattern: String,
    pub metrics_interval: Duration,
    pub filter_visibility_timeout: Duration,
}

impl MoverConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> MoverConfigBuilder {
        MoverConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: MoverConfigParams) -> Result<Self> {
        let MoverConfigParams {
            source_queue,
            destination_queue,
            client_count,
            limit,
            include_pattern,
            metrics_interval,
            filter_visibility_timeout,
        } = params;

        let config = Self {
            source_queue: trimmed_string(source_queue),
            destination_queue: trimmed_string(destination_queue),
            client_count,
            limit,
            include_pattern,
            metrics_interval,
            filter_visibility_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// Queue URL messages are drained from.
    pub fn source_queue(&self) -> &str {
        &self.source_queue
    }

    /// Queue URL messages are forwarded to.
    pub fn destination_queue(&self) -> &str {
        &self.destination_queue
    }

    /// Number of concurrent workers, each with its own queue client.
    pub fn client_count(&self) -> usize {
        self.client_count
    }

    pub fn limit(&self) -> TransferLimit {
        self.limit
    }

    /// Raw include pattern; empty means every message is forwarded.
    pub fn include_pattern(&self) -> &str {
        &self.include_pattern
    }

    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Visibility timeout requested on fetches while a filter is active, so that
    /// skipped messages stay out of the way until the source looks drained.
    pub fn filter_visibility_timeout(&self) -> Duration {
        self.filter_visibility_timeout
    }

    /// Compiles the include pattern.
    pub fn filter(&self) -> Result<Filter> {
        Filter::new(&self.include_pattern)
    }

    /// Receive options used by every worker fetch.
    pub fn receive_options(&self) -> ReceiveOptions {
        let options = ReceiveOptions::default();
        if self.include_pattern.is_empty() {
            options
        } else {
            options.with_visibility_timeout(self.filter_visibility_timeout)
        }
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        ensure_not_empty(&self.source_queue, "source_queue")?;
        ensure_not_empty(&self.destination_queue, "destination_queue")?;

        if self.client_count == 0 {
            bail!("client_count must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        if self.filter_visibility_timeout.is_zero() {
            bail!("filter_visibility_timeout must be greater than 0");
        }

        if self.filter_visibility_timeout > MAX_VISIBILITY_TIMEOUT {
            bail!(
                "filter_visibility_timeout ({}s) must not exceed {}s",
                self.filter_visibility_timeout.as_secs(),
                MAX_VISIBILITY_TIMEOUT.as_secs(),
            );
        }

        self.filter()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MoverConfigBuilder {
    source_queue: Option<String>,
    destination_queue: Option<String>,
    client_count: Option<usize>,
    limit: Option<TransferLimit>,
    include_pattern: Option<String>,
    metrics_interval: Option<Duration>,
    filter_visibility_timeout: Option<Duration>,
}

impl MoverConfigBuilder {
    pub fn source_queue(mut self, url: impl Into<String>) -> Self {
        self.source_queue = Some(url.into());
        self
    }

    pub fn destination_queue(mut self, url: impl Into<String>) -> Self {
        self.destination_queue = Some(url.into());
        self
    }

    pub fn client_count(mut self, count: usize) -> Self {
        self.client_count = Some(count);
        self
    }

    pub fn limit(mut self, limit: TransferLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn include_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.include_pattern = Some(pattern.into());
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn filter_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.filter_visibility_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<MoverConfig> {
        let params = MoverConfigParams {
            source_queue: self.source_queue.context("source_queue is required")?,
            destination_queue: self
                .destination_queue
                .context("destination_queue is required")?,
            client_count: self.client_count.unwrap_or(DEFAULT_CLIENT_COUNT),
            limit: self.limit.unwrap_or(TransferLimit::UNBOUNDED),
            include_pattern: self.include_pattern.unwrap_or_default(),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
            filter_visibility_timeout: self.filter_visibility_timeout.unwrap_or_else(|| {
                Duration::from_secs(DEFAULT_FILTER_VISIBILITY_TIMEOUT_SECS)
            }),
        };

        MoverConfig::new(params)
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}
