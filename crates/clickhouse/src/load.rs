//! Bulk loads into the analytical store.

use async_trait::async_trait;
use clickhouse::Row;
use serde::Serialize;
use std::time::Instant;
use stream_core::{LoadPayload, LoadRow};
use thiserror::Error;
use tracing::debug;

use crate::client::ClickHouseClient;

/// Why a load failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The store may accept the same payload later.
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// Retrying the same payload cannot succeed.
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A columnar store accepting COPY-style bulk loads.
#[async_trait]
pub trait AnalyticalStore: Send + Sync {
    /// Load every row of the payload, or fail without partial visibility
    /// the caller needs to care about.
    async fn load(&self, payload: &LoadPayload) -> Result<(), DeliveryError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// ClickHouse server error codes worth retrying.
const TRANSIENT_CODES: &[u32] = &[
    159, // TIMEOUT_EXCEEDED
    202, // TOO_MANY_SIMULTANEOUS_QUERIES
    203, // NO_FREE_CONNECTION
    209, // SOCKET_TIMEOUT
    210, // NETWORK_ERROR
    241, // MEMORY_LIMIT_EXCEEDED
    242, // TABLE_IS_READ_ONLY
    252, // TOO_MANY_PARTS
];

/// Row of the events table, in the payload's column order.
#[derive(Debug, Clone, PartialEq, Row, Serialize)]
pub struct EventRow {
    pub id: String,
    pub timestamp: String,
    pub coordinate_x: f64,
    pub coordinate_y: f64,
    pub is_drawing: bool,
}

impl From<LoadRow> for EventRow {
    fn from(row: LoadRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp,
            coordinate_x: row.coordinate_x,
            coordinate_y: row.coordinate_y,
            is_drawing: row.is_drawing,
        }
    }
}

/// Rows of a payload in arrival order. A body that does not decode can
/// never load.
pub fn event_rows(payload: &LoadPayload) -> Result<Vec<EventRow>, DeliveryError> {
    let rows = payload
        .decode_rows()
        .map_err(|e| DeliveryError::Permanent(format!("undecodable payload: {}", e)))?;
    Ok(rows.into_iter().map(EventRow::from).collect())
}

/// Analytical store backed by a ClickHouse MergeTree table.
#[derive(Clone)]
pub struct ClickHouseAnalyticalStore {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseAnalyticalStore {
    pub fn new(client: ClickHouseClient) -> Self {
        let table = client.config().events_table_name();
        Self { client, table }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl AnalyticalStore for ClickHouseAnalyticalStore {
    async fn load(&self, payload: &LoadPayload) -> Result<(), DeliveryError> {
        if payload.rows == 0 {
            return Ok(());
        }

        let rows = event_rows(payload)?;
        let start = Instant::now();

        let mut insert = self
            .client
            .inner()
            .insert::<EventRow>(&self.table)
            .map_err(classify)?;
        for row in &rows {
            insert.write(row).await.map_err(classify)?;
        }
        insert.end().await.map_err(classify)?;

        debug!(
            stream = %payload.stream,
            batch_seq = payload.batch_sequence,
            rows = rows.len(),
            latency_ms = %start.elapsed().as_millis(),
            "Loaded batch into ClickHouse"
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), DeliveryError> {
        self.client
            .inner()
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// Classify a ClickHouse client error.
pub fn classify(err: clickhouse::error::Error) -> DeliveryError {
    use clickhouse::error::Error as ChError;

    match err {
        ChError::Network(e) => DeliveryError::Transient(format!("network: {}", e)),
        ChError::TimedOut => DeliveryError::Transient("timed out".to_string()),
        ChError::BadResponse(message) => match server_error_code(&message) {
            Some(code) if TRANSIENT_CODES.contains(&code) => DeliveryError::Transient(message),
            Some(_) => DeliveryError::Permanent(message),
            // No server code: a proxy or the server answered with a bare HTTP error
            None => DeliveryError::Transient(message),
        },
        other => DeliveryError::Permanent(other.to_string()),
    }
}

/// Extract `N` from a server message of the form `Code: N. DB::Exception: ...`.
fn server_error_code(message: &str) -> Option<u32> {
    let rest = &message[message.find("Code: ")? + "Code: ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
