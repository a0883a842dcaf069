use anyhow::{bail, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel accepted on the command line for "no limit".
pub const UNBOUNDED_RAW: i64 = -1;

/// Optional ceiling on the number of messages moved across all workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferLimit(Option<u64>);

impl TransferLimit {
    pub const UNBOUNDED: Self = Self(None);

    pub fn at_most(max: u64) -> Self {
        Self(Some(max))
    }

    /// Maps the raw command-line value: `-1` is unbounded, other negatives are rejected.
    pub fn from_raw(raw: i64) -> Result<Self> {
        match raw {
            UNBOUNDED_RAW => Ok(Self::UNBOUNDED),
            value if value < 0 => bail!("limit must be -1 (unbounded) or non-negative, got {value}"),
            value => Ok(Self(Some(value as u64))),
        }
    }

    pub fn max(&self) -> Option<u64> {
        self.0
    }

    pub fn is_reached(&self, moved: u64) -> bool {
        self.0.is_some_and(|max| moved >= max)
    }
}

impl fmt::Display for TransferLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(max) => write!(f, "{max}"),
            None => write!(f, "unbounded"),
        }
    }
}

/// Process-wide count of messages successfully forwarded to the destination.
///
/// Only ever increases. The limit check and the increment are separate atomic
/// operations, so concurrent pipelines may overshoot the limit slightly.
#[derive(Debug, Default)]
pub struct MovedCounter {
    moved: AtomicU64,
}

impl MovedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_moved(&self) -> u64 {
        self.moved.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    pub fn moved(&self) -> u64 {
        self.moved.load(Ordering::SeqCst)
    }

    pub fn limit_reached(&self, limit: TransferLimit) -> bool {
        limit.is_reached(self.moved())
    }
}
