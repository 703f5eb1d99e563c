//! Object storage notification endpoint.

use axum::{extract::State, Json};
use serde_json::Value;
use storage::{ObjectEvent, ObjectRef};
use worker::RouteOutcome;

use crate::response::{ApiError, ExtractionResponse};
use crate::state::AppState;

/// POST /v1/notifications - Route an object storage notification.
///
/// Unmatched notifications are acknowledged with status `dropped`.
/// Extraction failures go to operator reporting, not to the caller.
pub async fn notification_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ExtractionResponse>, ApiError> {
    let event = ObjectEvent::parse(body)?;
    let outcome = state.pipeline.router().route(&event).await;
    Ok(Json(extraction_response(&event.object(), outcome)))
}

pub(crate) fn extraction_response(object: &ObjectRef, outcome: RouteOutcome) -> ExtractionResponse {
    let (status, record) = match outcome {
        RouteOutcome::Dropped => ("dropped", None),
        RouteOutcome::Extracted(Some(record)) => ("extracted", Some(record)),
        RouteOutcome::Extracted(None) => ("empty", None),
        RouteOutcome::Failed(_) => ("failed", None),
    };

    ExtractionResponse {
        bucket: object.bucket.clone(),
        key: object.key.clone(),
        status: status.to_string(),
        record,
    }
}
