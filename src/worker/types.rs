use crate::transfer::pipeline::PipelineOutcome;

/// Why a worker returned without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Two consecutive fetches came back empty.
    Drained,
    LimitReached,
    /// The run token was cancelled (fatal error elsewhere or Ctrl-C).
    Cancelled,
}

/// Termination heuristic: a worker is done once the current fetch and the one
/// before it both returned no messages.
///
/// The previous count starts at 1 so a single empty first fetch does not stop
/// the worker; a fresh worker needs two empty fetches in a row.
#[derive(Debug)]
pub struct EmptyFetchTracker {
    last_count: usize,
}

impl Default for EmptyFetchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EmptyFetchTracker {
    pub fn new() -> Self {
        Self { last_count: 1 }
    }

    /// Records the size of a fetch and reports whether the source looks exhausted.
    pub fn observe(&mut self, count: usize) -> bool {
        let exhausted = count == 0 && self.last_count == 0;
        self.last_count = count;
        exhausted
    }
}

/// Tally of pipeline outcomes for one dispatched batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub moved: usize,
    pub unacknowledged: usize,
    pub filtered: usize,
    pub skipped_for_limit: usize,
    pub send_failed: usize,
}

impl BatchReport {
    pub(super) fn record(&mut self, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Moved => self.moved += 1,
            PipelineOutcome::MovedUnacknowledged => self.unacknowledged += 1,
            PipelineOutcome::Filtered => self.filtered += 1,
            PipelineOutcome::SkippedForLimit => self.skipped_for_limit += 1,
            PipelineOutcome::SendFailed => self.send_failed += 1,
        }
    }

    pub fn forwarded(&self) -> usize {
        self.moved + self.unacknowledged
    }
}
