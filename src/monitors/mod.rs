//! Probe execution and admission control
//!
//! - [`probe`]: issues one bounded HTTP request and classifies the outcome
//! - [`limiter`]: bounds how many probes run at once across all monitors

pub mod limiter;
pub mod probe;

pub use limiter::{ConcurrencyLimiter, ProbePermit};
pub use probe::{ProbeExecutor, ProbeOutcome};
