//! Test fixtures and record generators.

use serde_json::{json, Value};

/// A valid producer record.
pub fn record(recording_id: &str, timestamp: u64) -> Value {
    json!({
        "recordingId": recording_id,
        "timestamp": timestamp.to_string(),
        "coordinateX": 10.5,
        "coordinateY": 20.25,
        "isDrawing": true
    })
}

/// N valid records of one recording, timestamps 1..=n.
pub fn records(recording_id: &str, n: usize) -> Vec<Value> {
    (1..=n as u64).map(|ts| record(recording_id, ts)).collect()
}

/// A record missing its recording id.
pub fn invalid_record() -> Value {
    json!({
        "timestamp": "1",
        "coordinateX": 1.0,
        "coordinateY": 1.0,
        "isDrawing": false
    })
}

/// Array format payload.
pub fn array_payload(records: Vec<Value>) -> String {
    Value::Array(records).to_string()
}

/// Object format payload.
pub fn object_payload(records: Vec<Value>) -> String {
    json!({ "records": records }).to_string()
}

/// Single record payload.
pub fn single_payload(record: Value) -> String {
    record.to_string()
}

/// A request over the per-request record limit.
pub fn oversized_request() -> Vec<Value> {
    records("r-big", 1001)
}

/// Uploaded record file holding one record.
pub fn record_file(recording_id: &str, timestamp: u64) -> String {
    record(recording_id, timestamp).to_string()
}

/// Object-created notification in the event-bus envelope form.
pub fn created_envelope(bucket: &str, key: &str) -> Value {
    json!({
        "source": "aws.s3",
        "detail-type": "Object Created",
        "detail": {
            "bucket": { "name": bucket },
            "object": { "key": key }
        }
    })
}
