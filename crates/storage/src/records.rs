//! Structured record store.
//!
//! Records are keyed by partition key `id` and sort key `timestamp`. A put
//! with an existing key replaces the item, which makes replayed extractions
//! idempotent.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use stream_core::StructuredRecord;

use crate::error::RecordStoreError;

/// Inclusive sort-key bounds. Sort keys compare as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TimestampRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    pub fn contains(&self, timestamp: &str) -> bool {
        self.from.as_deref().map_or(true, |from| timestamp >= from)
            && self.to.as_deref().map_or(true, |to| timestamp <= to)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record at its key.
    async fn put(&self, record: &StructuredRecord) -> Result<(), RecordStoreError>;

    async fn get(&self, id: &str, timestamp: &str)
        -> Result<Option<StructuredRecord>, RecordStoreError>;

    /// Records of one recording in sort-key order.
    async fn query(
        &self,
        id: &str,
        range: &TimestampRange,
    ) -> Result<Vec<StructuredRecord>, RecordStoreError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), RecordStoreError> {
        Ok(())
    }
}

/// Process-local record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    items: RwLock<BTreeMap<(String, String), StructuredRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &StructuredRecord) -> Result<(), RecordStoreError> {
        let key = (record.id.clone(), record.timestamp.clone());
        self.items.write().insert(key, record.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: &str,
        timestamp: &str,
    ) -> Result<Option<StructuredRecord>, RecordStoreError> {
        Ok(self
            .items
            .read()
            .get(&(id.to_string(), timestamp.to_string()))
            .cloned())
    }

    async fn query(
        &self,
        id: &str,
        range: &TimestampRange,
    ) -> Result<Vec<StructuredRecord>, RecordStoreError> {
        let items = self.items.read();
        Ok(items
            .iter()
            .filter(|((item_id, ts), _)| item_id == id && range.contains(ts))
            .map(|(_, record)| record.clone())
            .collect())
    }
}
