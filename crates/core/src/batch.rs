//! Sealed batch types.
//!
//! A batch is owned by its stream until sealed; the sealed form is immutable
//! and is what the dispatcher and the backup writer see.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::AdmittedRecord;

/// What sealed a batch. Exactly one trigger is recorded per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SealTrigger {
    /// `elapsed(opened_at) >= buffer_interval_seconds`
    Interval,
    /// `size_bytes >= buffer_size_threshold_bytes`
    Size,
    /// Drained on shutdown
    Flush,
}

impl SealTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Size => "size",
            Self::Flush => "flush",
        }
    }
}

/// Batch metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    /// Source stream name
    pub stream: String,
    /// Start time (ms) of the engine run that sealed the batch; sequences
    /// restart with every run
    #[serde(default)]
    pub epoch: u64,
    /// Batch sequence within the stream (the batch generation)
    pub sequence: u64,
    pub opened_at: DateTime<Utc>,
    pub sealed_at: DateTime<Utc>,
    pub size_bytes: usize,
    pub record_count: usize,
    pub trigger: SealTrigger,
}

/// An immutable, sealed batch of records in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedBatch {
    pub metadata: BatchMetadata,
    pub records: Vec<AdmittedRecord>,
}

impl SealedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Short identifier for logs: `stream#sequence`.
    pub fn label(&self) -> String {
        format!("{}#{}", self.metadata.stream, self.metadata.sequence)
    }
}
