//! Runtime glue that wires configuration, fail-fast error handling, telemetry
//! and the signal-aware runner.

pub mod config;
pub mod fatal;
pub mod runner;
pub mod telemetry;
