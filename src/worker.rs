//! Worker module split across focused submodules:
//! - `types`: exit reasons, the empty-fetch termination tracker, batch reports
//! - `shared`: state shared by every worker of a run (counter, filter, limit)
//! - `process`: worker struct plus the fetch/dispatch loop
//! - `batch`: fetching one batch and fanning it out through the pipeline
//! - `tests`: worker unit tests against the in-memory broker

mod batch;
mod process;
mod shared;
mod types;


pub use process::Worker;
pub use shared::{WorkerShared, WorkerSharedParams};
pub use types::{BatchReport, EmptyFetchTracker, WorkerExit};
