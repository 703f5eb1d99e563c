//! Record file uploads.
//!
//! Writes the file to the intake bucket, then feeds a created notification
//! for it through the notification router, the same path an external
//! object storage notification takes.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use object_store::{path::Path as ObjectPath, PutPayload};
use storage::{ObjectEvent, ObjectRef};
use stream_core::{limits::MAX_UPLOAD_SIZE_BYTES, Scope, ValidationErrorCode};
use tracing::{error, info};

use crate::extractors::BearerToken;
use crate::response::{ApiError, ExtractionResponse};
use crate::routes::notifications::extraction_response;
use crate::state::AppState;

/// PUT /v1/uploads/{*key} - Upload a record file.
pub async fn upload_handler(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ExtractionResponse>), ApiError> {
    state
        .credentials
        .validate(&token, Scope::UploadsWrite)
        .await?;

    if body.len() > MAX_UPLOAD_SIZE_BYTES {
        return Err(ApiError::validation(
            ValidationErrorCode::RecordTooLarge.code(),
            vec![format!(
                "Upload size {}KB exceeds {}KB limit",
                body.len() / 1024,
                MAX_UPLOAD_SIZE_BYTES / 1024
            )],
        ));
    }

    let path = ObjectPath::parse(&key)
        .map_err(|e| ApiError::bad_request(format!("Invalid object key: {}", e)))?;
    if path.as_ref().is_empty() {
        return Err(ApiError::bad_request("Object key is required"));
    }

    let stores = state.pipeline.stores();
    let size = body.len();
    stores
        .intake_store
        .put(&path, PutPayload::from_bytes(body))
        .await
        .map_err(|e| {
            error!(key = %key, error = %e, "Failed to write upload");
            ApiError::internal("Failed to store upload")
        })?;

    info!(bucket = %stores.intake_bucket, key = %key, size, "Record file uploaded");

    let object = ObjectRef::new(stores.intake_bucket.clone(), path.to_string());
    let outcome = state
        .pipeline
        .router()
        .route(&ObjectEvent::created(&object))
        .await;

    Ok((StatusCode::CREATED, Json(extraction_response(&object, outcome))))
}
