//! Storage adapters for the canvastream pipeline.
//!
//! - Object stores (backup bucket, intake bucket) built from configuration
//! - Object-created notification parsing
//! - The structured record store interface and its in-memory implementation

pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod health;
pub mod paths;
pub mod records;

pub use config::{ObjectStoreConfig, StoreBackend};
pub use error::{RecordStoreError, StorageError};
pub use events::{ObjectEvent, ObjectRef};
pub use factory::build_object_store;
pub use records::{MemoryRecordStore, RecordStore, TimestampRange};
