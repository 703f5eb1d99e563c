//! Analytical store load format.
//!
//! Sealed batches are transformed to JSON Lines: one JSON object per record,
//! keys in the fixed column order `id, timestamp, coordinate_x, coordinate_y,
//! is_drawing`. Rows keep the batch's arrival order.

use serde::{Deserialize, Serialize};

use crate::batch::SealedBatch;
use crate::record::EventRecord;

/// Column order of the analytical table.
pub const LOAD_COLUMNS: [&str; 5] = ["id", "timestamp", "coordinate_x", "coordinate_y", "is_drawing"];

/// One row of the load payload. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRow {
    pub id: String,
    pub timestamp: String,
    pub coordinate_x: f64,
    pub coordinate_y: f64,
    pub is_drawing: bool,
}

impl From<&EventRecord> for LoadRow {
    fn from(record: &EventRecord) -> Self {
        Self {
            id: record.recording_id.clone(),
            timestamp: record.timestamp.clone(),
            coordinate_x: record.coordinate_x,
            coordinate_y: record.coordinate_y,
            is_drawing: record.is_drawing,
        }
    }
}

impl LoadRow {
    /// Encoded length of this row without the line terminator.
    pub fn encoded_len(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

/// A sealed batch transformed for bulk load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPayload {
    /// Source stream of the batch
    pub stream: String,
    /// Batch sequence within the stream
    pub batch_sequence: u64,
    /// Newline-delimited JSON rows
    pub body: String,
    /// Number of rows in `body`
    pub rows: usize,
}

impl LoadPayload {
    /// Transform a sealed batch into its load payload.
    pub fn from_batch(batch: &SealedBatch) -> crate::Result<Self> {
        let mut body = String::with_capacity(batch.metadata.size_bytes);
        for admitted in &batch.records {
            let line = serde_json::to_string(&LoadRow::from(&admitted.record))?;
            body.push_str(&line);
            body.push('\n');
        }

        Ok(Self {
            stream: batch.metadata.stream.clone(),
            batch_sequence: batch.metadata.sequence,
            body,
            rows: batch.records.len(),
        })
    }

    /// Iterate the encoded lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines()
    }

    /// Decode the rows back (used by tests and by load verification).
    pub fn decode_rows(&self) -> crate::Result<Vec<LoadRow>> {
        self.lines()
            .map(|line| serde_json::from_str(line).map_err(crate::Error::from))
            .collect()
    }
}
