//! Object storage notifications.
//!
//! Two shapes are accepted:
//! - the event-bus envelope (`source: "aws.s3"`, `detail-type: "Object Created"`,
//!   `detail.bucket.name`, `detail.object.key`)
//! - a flat `{source, eventType, bucket, key}` object
//!
//! Object keys arrive URL-encoded with `+` for spaces and are decoded here.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stream_core::{Error, Result};

/// Normalized source name for object storage notifications.
pub const SOURCE_OBJECT_STORAGE: &str = "object-storage";

/// Normalized event type for object creation.
pub const EVENT_CREATED: &str = "created";

/// A bucket + key pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A normalized object storage notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEvent {
    pub source: String,
    pub event_type: String,
    pub bucket: String,
    /// Decoded object key
    pub key: String,
}

#[derive(Deserialize)]
struct Envelope {
    source: String,
    #[serde(rename = "detail-type")]
    detail_type: String,
    detail: EnvelopeDetail,
}

#[derive(Deserialize)]
struct EnvelopeDetail {
    bucket: NamedBucket,
    object: EnvelopeObject,
}

#[derive(Deserialize)]
struct NamedBucket {
    name: String,
}

#[derive(Deserialize)]
struct EnvelopeObject {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatEvent {
    #[serde(default = "default_source")]
    source: String,
    #[serde(default = "default_event_type")]
    event_type: String,
    bucket: String,
    key: String,
}

fn default_source() -> String {
    SOURCE_OBJECT_STORAGE.to_string()
}

fn default_event_type() -> String {
    EVENT_CREATED.to_string()
}

impl ObjectEvent {
    /// A created notification for an object.
    pub fn created(object: &ObjectRef) -> Self {
        Self {
            source: SOURCE_OBJECT_STORAGE.to_string(),
            event_type: EVENT_CREATED.to_string(),
            bucket: object.bucket.clone(),
            key: object.key.clone(),
        }
    }

    /// Parse a notification body.
    pub fn parse(value: Value) -> Result<Self> {
        if value.get("detail").is_some() {
            let envelope: Envelope = serde_json::from_value(value)
                .map_err(|e| Error::validation(format!("invalid notification envelope: {}", e)))?;
            return Ok(Self {
                source: normalize_source(&envelope.source),
                event_type: normalize_event_type(&envelope.detail_type),
                bucket: envelope.detail.bucket.name,
                key: decode_key(&envelope.detail.object.key),
            });
        }

        let flat: FlatEvent = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("invalid notification: {}", e)))?;
        Ok(Self {
            source: normalize_source(&flat.source),
            event_type: normalize_event_type(&flat.event_type),
            bucket: flat.bucket,
            key: decode_key(&flat.key),
        })
    }

    pub fn object(&self) -> ObjectRef {
        ObjectRef::new(self.bucket.clone(), self.key.clone())
    }
}

fn normalize_source(source: &str) -> String {
    match source {
        "aws.s3" | "s3" => SOURCE_OBJECT_STORAGE.to_string(),
        other => other.to_string(),
    }
}

fn normalize_event_type(event_type: &str) -> String {
    let lowered = event_type.trim().to_ascii_lowercase();
    match lowered.strip_prefix("object ") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Decode a form-encoded object key: `+` becomes a space, `%XX` a byte.
/// Malformed escapes are kept as-is.
pub fn decode_key(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
