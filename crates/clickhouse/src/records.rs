//! Structured record store on ClickHouse.

use async_trait::async_trait;
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use storage::{RecordStore, RecordStoreError, TimestampRange};
use stream_core::StructuredRecord;

use crate::client::ClickHouseClient;
use crate::load::{classify, DeliveryError};

/// Row of the records table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct RecordRow {
    pub id: String,
    pub timestamp: String,
    pub coordinate_x: f64,
    pub coordinate_y: f64,
    pub is_drawing: bool,
}

impl From<&StructuredRecord> for RecordRow {
    fn from(record: &StructuredRecord) -> Self {
        Self {
            id: record.id.clone(),
            timestamp: record.timestamp.clone(),
            coordinate_x: record.coordinate_x,
            coordinate_y: record.coordinate_y,
            is_drawing: record.is_drawing,
        }
    }
}

impl From<RecordRow> for StructuredRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp,
            coordinate_x: row.coordinate_x,
            coordinate_y: row.coordinate_y,
            is_drawing: row.is_drawing,
        }
    }
}

/// Record store on a ReplacingMergeTree ordered by `(id, timestamp)`.
///
/// Reads use `FINAL` so a key written twice reads back once.
#[derive(Clone)]
pub struct ClickHouseRecordStore {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseRecordStore {
    pub fn new(client: ClickHouseClient) -> Self {
        let table = client.config().records_table_name();
        Self { client, table }
    }

    fn select(&self) -> String {
        format!(
            "SELECT ?fields FROM {} FINAL WHERE id = ?",
            self.table
        )
    }
}

fn store_error(err: clickhouse::error::Error) -> RecordStoreError {
    match classify(err) {
        DeliveryError::Transient(message) => RecordStoreError::Unavailable(message),
        DeliveryError::Permanent(message) => RecordStoreError::Rejected(message),
    }
}

#[async_trait]
impl RecordStore for ClickHouseRecordStore {
    async fn put(&self, record: &StructuredRecord) -> Result<(), RecordStoreError> {
        let mut insert = self
            .client
            .inner()
            .insert(&self.table)
            .map_err(store_error)?;
        insert
            .write(&RecordRow::from(record))
            .await
            .map_err(store_error)?;
        insert.end().await.map_err(store_error)
    }

    async fn get(
        &self,
        id: &str,
        timestamp: &str,
    ) -> Result<Option<StructuredRecord>, RecordStoreError> {
        let row = self
            .client
            .inner()
            .query(&format!("{} AND timestamp = ? LIMIT 1", self.select()))
            .bind(id)
            .bind(timestamp)
            .fetch_optional::<RecordRow>()
            .await
            .map_err(store_error)?;
        Ok(row.map(StructuredRecord::from))
    }

    async fn query(
        &self,
        id: &str,
        range: &TimestampRange,
    ) -> Result<Vec<StructuredRecord>, RecordStoreError> {
        let mut sql = self.select();
        if range.from.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if range.to.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        sql.push_str(" ORDER BY timestamp");

        let mut query = self.client.inner().query(&sql).bind(id);
        if let Some(from) = &range.from {
            query = query.bind(from.as_str());
        }
        if let Some(to) = &range.to {
            query = query.bind(to.as_str());
        }

        let rows = query.fetch_all::<RecordRow>().await.map_err(store_error)?;
        Ok(rows.into_iter().map(StructuredRecord::from).collect())
    }

    async fn ping(&self) -> Result<(), RecordStoreError> {
        self.client
            .inner()
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map(|_| ())
            .map_err(store_error)
    }
}
