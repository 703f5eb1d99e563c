//! Size limits enforced at intake.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so the string limits are duplicated on `EventRecord`. Keep both in sync.

// === Request Limits ===

/// Maximum request payload size in bytes (1MB).
pub const MAX_REQUEST_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum records per intake request.
pub const MAX_REQUEST_RECORDS: usize = 1000;

/// Maximum serialized size of a single record (4KB).
///
/// A coordinate sample is ~120 bytes; anything near this is garbage.
pub const MAX_RECORD_SIZE_BYTES: usize = 4 * 1024;

// === Field Limits (chars) ===

/// Recording identifier max length.
pub const MAX_RECORDING_ID_LEN: usize = 128;

/// Timestamp max length (ISO-8601 with nanos is ~35 chars).
pub const MAX_TIMESTAMP_LEN: usize = 64;

/// Allowed recording identifier characters.
pub const RECORDING_ID_PATTERN: &str = r"^[A-Za-z0-9_.:\-]+$";

// === Upload Limits ===

/// Maximum uploaded record file size (256KB).
pub const MAX_UPLOAD_SIZE_BYTES: usize = 256 * 1024;
