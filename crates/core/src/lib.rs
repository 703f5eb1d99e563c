//! Core types, validation, and load formats for the canvastream pipeline.

pub mod batch;
pub mod config;
pub mod credential;
pub mod error;
pub mod limits;
pub mod load;
pub mod record;
pub mod structured;

pub use batch::*;
pub use config::PipelineConfig;
pub use credential::*;
pub use error::{AuthErrorCode, Error, Result, ValidationErrorCode};
pub use load::{LoadPayload, LoadRow, LOAD_COLUMNS};
pub use record::*;
pub use structured::StructuredRecord;
