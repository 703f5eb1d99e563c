//! Background workers for the canvastream pipeline.
//!
//! Handles async workflows:
//! - Dispatcher (sealed batch → analytical store, backup on failure)
//! - Backup writer (sealed batch → object storage, replay)
//! - Extraction (uploaded record file → structured store)
//! - Notification routing (object-created event → extraction)
//! - Failure reporting (operator alerts)

pub mod backup;
pub mod dispatcher;
pub mod extraction;
pub mod failures;
pub mod pipeline;
pub mod router;
pub mod scheduler;
#[cfg(test)]
pub(crate) mod testing;

pub use backup::{BackupError, BackupReference, BackupWriter};
pub use dispatcher::*;
pub use extraction::{ExtractionError, ExtractionWorker};
pub use failures::{FailureChannel, FailureReport, FailureReporter};
pub use pipeline::{Pipeline, PipelineStores};
pub use router::{NotificationRouter, RouteOutcome, Subscription};
pub use scheduler::*;
