//! Query functions for reading loaded data back (used in tests and admin).

use crate::client::ClickHouseClient;
use clickhouse::Row;
use serde::Deserialize;
use stream_core::{Error, Result};

/// A loaded event row.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct QueryEventRow {
    pub id: String,
    pub timestamp: String,
    pub coordinate_x: f64,
    pub coordinate_y: f64,
    pub is_drawing: bool,
}

/// Count loaded events for a recording.
pub async fn count_recording_events(client: &ClickHouseClient, recording_id: &str) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query(&format!(
            "SELECT count() FROM {} WHERE id = ?",
            client.config().events_table_name()
        ))
        .bind(recording_id)
        .fetch_one()
        .await
        .map_err(|e| Error::internal(format!("Query error: {}", e)))?;
    Ok(count)
}

/// Count all loaded events (for testing).
pub async fn count_all_events(client: &ClickHouseClient) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query(&format!(
            "SELECT count() FROM {}",
            client.config().events_table_name()
        ))
        .fetch_one()
        .await
        .map_err(|e| Error::internal(format!("Query error: {}", e)))?;
    Ok(count)
}

/// Fetch a recording's loaded events in sort-key order.
pub async fn query_recording_events(
    client: &ClickHouseClient,
    recording_id: &str,
    limit: u32,
) -> Result<Vec<QueryEventRow>> {
    let rows: Vec<QueryEventRow> = client
        .inner()
        .query(&format!(
            "SELECT ?fields FROM {} WHERE id = ? ORDER BY timestamp LIMIT ?",
            client.config().events_table_name()
        ))
        .bind(recording_id)
        .bind(limit)
        .fetch_all()
        .await
        .map_err(|e| Error::internal(format!("Query error: {}", e)))?;
    Ok(rows)
}

/// Truncate loaded events (test cleanup).
pub async fn truncate_events(client: &ClickHouseClient) -> Result<()> {
    client
        .inner()
        .query(&format!(
            "TRUNCATE TABLE IF EXISTS {}",
            client.config().events_table_name()
        ))
        .execute()
        .await
        .map_err(|e| Error::internal(format!("Truncate error: {}", e)))?;
    Ok(())
}
