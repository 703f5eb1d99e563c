//! Event records as emitted by producers.
//!
//! This module handles:
//! - Parsing producer payloads (camelCase, string or integer timestamps)
//! - Validating required fields
//! - Supporting 3 payload formats (array, object with records, single)

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{MAX_RECORD_SIZE_BYTES, MAX_REQUEST_RECORDS, RECORDING_ID_PATTERN};
use crate::load::LoadRow;

static RECORDING_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RECORDING_ID_PATTERN).expect("invalid recording id pattern"));

/// A single coordinate sample of a drawing session.
///
/// Uniquely identified by `(recording_id, timestamp)`; the timestamp is the
/// sort key within a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Recording (drawing session) identifier
    #[serde(alias = "id")]
    #[validate(length(min = 1, max = 128))]
    pub recording_id: String,

    /// Producer timestamp, normalized to a string
    #[serde(deserialize_with = "deserialize_timestamp")]
    #[validate(length(min = 1, max = 64))]
    pub timestamp: String,

    pub coordinate_x: f64,

    pub coordinate_y: f64,

    /// Whether the pointer was down when the sample was taken
    pub is_drawing: bool,
}

impl EventRecord {
    /// Deserialize and validate a record from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let record: EventRecord = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("invalid record: {}", e)))?;
        record.check()?;
        Ok(record)
    }

    /// Validate field contents.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(format!("{}", e)))?;

        if !RECORDING_ID_REGEX.is_match(&self.recording_id) {
            return Err(Error::validation(
                "recordingId may only contain letters, digits, '_', '.', ':' and '-'",
            ));
        }
        if self.timestamp.trim().is_empty() {
            return Err(Error::validation("timestamp is required"));
        }
        if !self.coordinate_x.is_finite() || !self.coordinate_y.is_finite() {
            return Err(Error::validation("coordinates must be finite numbers"));
        }

        let size = self.size_bytes();
        if size > MAX_RECORD_SIZE_BYTES {
            return Err(Error::validation_code(
                ValidationErrorCode::RecordTooLarge,
                format!("record is {} bytes, limit is {}", size, MAX_RECORD_SIZE_BYTES),
            ));
        }

        Ok(())
    }

    /// Size this record contributes to a batch: the length of its load line
    /// including the trailing newline.
    pub fn size_bytes(&self) -> usize {
        LoadRow::from(self).encoded_len() + 1
    }

    /// The record's unique key.
    pub fn key(&self) -> (&str, &str) {
        (&self.recording_id, &self.timestamp)
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    match RawTimestamp::deserialize(deserializer) {
        Ok(RawTimestamp::Text(s)) => Ok(s),
        Ok(RawTimestamp::Signed(n)) => Ok(n.to_string()),
        Ok(RawTimestamp::Unsigned(n)) => Ok(n.to_string()),
        Err(_) => Err(serde::de::Error::custom(
            "timestamp must be a string or an integer",
        )),
    }
}

/// A record accepted by intake, tagged with its arrival sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmittedRecord {
    /// Global arrival sequence assigned by intake
    pub sequence: u64,
    pub record: EventRecord,
    pub size_bytes: usize,
}

impl AdmittedRecord {
    pub fn new(sequence: u64, record: EventRecord) -> Self {
        let size_bytes = record.size_bytes();
        Self {
            sequence,
            record,
            size_bytes,
        }
    }
}

/// Parsed intake payload (supports 3 formats).
#[derive(Debug, Clone)]
pub struct RecordPayload {
    entries: Vec<Value>,
}

impl RecordPayload {
    /// Parse an intake payload from JSON bytes.
    /// Supports:
    /// 1. Array: `[record, record, ...]`
    /// 2. Object with records: `{ "records": [...] }`
    /// 3. Single record: `{ "recordingId": "...", "timestamp": ..., ... }`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::validation(format!("invalid JSON: {}", e)))?;

        let entries = match value {
            Value::Array(entries) => entries,
            Value::Object(mut obj) => {
                if let Some(records) = obj.remove("records") {
                    match records {
                        Value::Array(entries) => entries,
                        _ => return Err(Error::validation("'records' must be an array")),
                    }
                } else if obj.contains_key("recordingId") || obj.contains_key("id") {
                    vec![Value::Object(obj)]
                } else {
                    return Err(Error::validation(
                        "object must have a 'records' array or be a single record with 'recordingId'",
                    ));
                }
            }
            _ => {
                return Err(Error::validation(
                    "request body must be an array of records or an object",
                ))
            }
        };

        if entries.len() > MAX_REQUEST_RECORDS {
            return Err(Error::validation_code(
                ValidationErrorCode::BatchTooLarge,
                format!(
                    "request has {} records, exceeds {} limit",
                    entries.len(),
                    MAX_REQUEST_RECORDS
                ),
            ));
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate every entry, keeping request order.
    pub fn into_records(self) -> Vec<Result<EventRecord>> {
        self.entries.into_iter().map(EventRecord::from_value).collect()
    }
}
