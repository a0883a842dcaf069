//! Transfer orchestration: the coordinator, its worker pool, and the lifecycle
//! of background tasks (metrics reporter, fatal error handling) around a run.

pub mod lifecycle;
pub mod mover;
pub mod worker_pool;

pub use mover::{MessageMover, TransferSummary};
