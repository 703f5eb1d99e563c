//! Buffering and batching engine for the canvastream pipeline.
//!
//! Records are sharded into streams by recording id. Each stream is owned by
//! one actor task that accumulates an open batch and seals it on size or on
//! interval, then hands the sealed batch to the dispatcher.

pub mod backlog;
pub mod batch;
pub mod engine;
pub mod intake;
pub mod partitioner;

pub use backlog::Backlog;
pub use batch::{BufferState, StreamBuffer};
pub use engine::{BufferEngine, StreamSnapshot};
pub use intake::{AdmitReport, Admission, Intake};
