//! Receive-call knobs shared by every worker fetch, along with the fixed batch
//! cap and attribute selector used when draining a source queue.

use anyhow::{bail, Result};
use std::time::Duration;

/// Maximum number of messages a single receive call may return.
pub const MAX_BATCH_SIZE: usize = 10;
/// Selector requesting every user-defined message attribute.
pub const ALL_ATTRIBUTES: &str = "All";
/// Upper bound SQS accepts for a visibility timeout.
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub max_messages: usize,
    pub wait_time: Duration,
    /// `None` keeps the queue's configured default.
    pub visibility_timeout: Option<Duration>,
    pub attribute_names: Vec<String>,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_messages: MAX_BATCH_SIZE,
            wait_time: Duration::ZERO,
            visibility_timeout: None,
            attribute_names: vec![ALL_ATTRIBUTES.to_owned()],
        }
    }
}

impl ReceiveOptions {
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = Some(timeout);
        self
    }

    pub fn requests_all_attributes(&self) -> bool {
        self.attribute_names.iter().any(|name| name == ALL_ATTRIBUTES)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_messages == 0 || self.max_messages > MAX_BATCH_SIZE {
            bail!("max_messages must be between 1 and {MAX_BATCH_SIZE}");
        }
        if let Some(timeout) = self.visibility_timeout {
            if timeout > MAX_VISIBILITY_TIMEOUT {
                bail!("visibility_timeout must not exceed 12 hours");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_drain_fetch() {
        let options = ReceiveOptions::default();
        assert_eq!(options.max_messages, 10);
        assert!(options.wait_time.is_zero());
        assert_eq!(options.visibility_timeout, None);
        assert!(options.requests_all_attributes());
        options.validate().expect("defaults must validate");
    }

    #[test]
    fn rejects_oversized_batches_and_timeouts() {
        let options = ReceiveOptions {
            max_messages: 11,
            ..ReceiveOptions::default()
        };
        assert!(options.validate().is_err());

        let options = ReceiveOptions::default()
            .with_visibility_timeout(MAX_VISIBILITY_TIMEOUT + Duration::from_secs(1));
        assert!(options.validate().is_err());
    }
}
