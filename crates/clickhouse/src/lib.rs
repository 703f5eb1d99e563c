//! ClickHouse adapters for the canvastream pipeline.
//!
//! - `ClickHouseAnalyticalStore`: typed bulk inserts of sealed batches
//! - `ClickHouseRecordStore`: the structured record store

pub mod client;
pub mod config;
pub mod load;
pub mod query;
pub mod records;
pub mod schema;

pub use client::*;
pub use config::*;
pub use load::{AnalyticalStore, ClickHouseAnalyticalStore, DeliveryError, EventRow};
pub use query::*;
pub use records::ClickHouseRecordStore;
