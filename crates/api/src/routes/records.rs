//! Intake endpoint handler.
//!
//! Accepts event records in 3 formats:
//! 1. Array: `[record, record, ...]`
//! 2. Object with records: `{ "records": [...] }`
//! 3. Single record: `{ "recordingId": "...", "timestamp": ..., ... }`
//!
//! Records are admitted into the buffering engine; the response never waits
//! for delivery.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use std::time::Instant;
use stream_core::{
    limits::MAX_REQUEST_SIZE_BYTES, RecordPayload, Scope, ValidationErrorCode,
};
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::extractors::BearerToken;
use crate::response::{AdmitResponse, ApiError};
use crate::state::AppState;

/// POST /v1/records - Admit event records.
pub async fn records_handler(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    body: Bytes,
) -> Result<(StatusCode, Json<AdmitResponse>), ApiError> {
    let start = Instant::now();

    state
        .credentials
        .validate(&token, Scope::RecordsWrite)
        .await?;

    if !state.intake_limiter.check(token.as_str()) {
        metrics().rate_limited_requests.inc();
        return Err(ApiError::rate_limited(
            "Too many intake requests",
            Some(state.intake_limiter.retry_after_secs()),
        ));
    }

    // Check payload size before parsing
    if body.len() > MAX_REQUEST_SIZE_BYTES {
        return Err(ApiError::validation(
            ValidationErrorCode::BatchTooLarge.code(),
            vec![format!(
                "Payload size {}KB exceeds {}KB limit",
                body.len() / 1024,
                MAX_REQUEST_SIZE_BYTES / 1024
            )],
        ));
    }

    debug!(payload_size = body.len(), "Received records");

    let payload = RecordPayload::parse(&body)?;
    let total = payload.len();
    let report = state
        .pipeline
        .intake()
        .admit_many(payload.into_records());

    let accepted = report.accepted.len();
    let rejected = report.rejected.len();

    if accepted == 0 && rejected > 0 {
        // Nothing admitted: a capacity refusal wins so producers back off
        // and retry
        if report.hit_capacity() {
            let retry_after = report
                .rejected
                .iter()
                .find_map(|(_, e)| e.retry_after());
            warn!(rejected, "Intake at capacity");
            return Err(ApiError::capacity("Pipeline is at capacity", retry_after));
        }

        let details = report
            .rejected
            .iter()
            .map(|(index, e)| format!("record {}: {}", index, e))
            .collect();
        let code = report
            .rejected
            .first()
            .and_then(|(_, e)| e.error_code())
            .unwrap_or(ValidationErrorCode::InvalidFormat.code());
        return Err(ApiError::validation(code, details));
    }

    if rejected > 0 {
        warn!(accepted, rejected, "Some records were rejected");
    }

    info!(
        total,
        accepted,
        rejected,
        latency_ms = start.elapsed().as_millis() as u64,
        "Records admitted"
    );

    Ok((StatusCode::ACCEPTED, Json(AdmitResponse::from_report(&report))))
}
