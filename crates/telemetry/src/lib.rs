//! Telemetry for the canvastream pipeline.
//!
//! In-process metrics and component health, plus tracing setup. A scheduler
//! in the worker crate logs metric snapshots and refreshes health.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
