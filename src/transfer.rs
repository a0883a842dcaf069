//! Per-message transfer logic: the body filter, limit bookkeeping shared across
//! workers, and the filter → forward → acknowledge pipeline.

pub mod filter;
pub mod limit;
pub mod pipeline;

pub use filter::Filter;
pub use limit::{MovedCounter, TransferLimit};
pub use pipeline::{transfer_message, PipelineOutcome, TransferContext};
