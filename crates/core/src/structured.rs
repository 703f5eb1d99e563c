//! Structured store records derived from uploaded record files.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::EventRecord;

/// A record in the structured store.
///
/// Partition key is `id` (the recording id), sort key is `timestamp`; both
/// are copied from the source event so replays overwrite the same item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub id: String,
    pub timestamp: String,
    pub coordinate_x: f64,
    pub coordinate_y: f64,
    pub is_drawing: bool,
}

impl StructuredRecord {
    /// Partition and sort key.
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.timestamp)
    }

    /// Parse an uploaded record file into zero or one record.
    ///
    /// The body is either a single record object or an array holding at most
    /// one record. An empty array yields nothing.
    pub fn parse_file(body: &[u8]) -> Result<Option<Self>> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Error::parse(format!("body is not valid JSON: {}", e)))?;

        let value = match value {
            Value::Array(mut items) => match items.len() {
                0 => return Ok(None),
                1 => items.remove(0),
                n => {
                    return Err(Error::parse(format!(
                        "record file holds {} records, expected at most one",
                        n
                    )))
                }
            },
            Value::Object(_) => value,
            _ => return Err(Error::parse("record file must be a JSON object or array")),
        };

        let record = EventRecord::from_value(value).map_err(|e| match e {
            Error::Validation { message, .. } => Error::parse(message),
            other => other,
        })?;

        Ok(Some(Self::from(record)))
    }
}

impl From<EventRecord> for StructuredRecord {
    fn from(record: EventRecord) -> Self {
        Self {
            id: record.recording_id,
            timestamp: record.timestamp,
            coordinate_x: record.coordinate_x,
            coordinate_y: record.coordinate_y,
            is_drawing: record.is_drawing,
        }
    }
}
