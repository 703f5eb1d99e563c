//! Credential issuance endpoint.

use axum::{extract::State, Json};
use telemetry::metrics;
use tracing::warn;

use crate::extractors::ClientIp;
use crate::response::{ApiError, CredentialResponse};
use crate::state::AppState;

/// POST /v1/credentials - Issue an anonymous producer credential.
pub async fn issue_handler(
    State(state): State<AppState>,
    client_ip: ClientIp,
) -> Result<Json<CredentialResponse>, ApiError> {
    if !state.issue_limiter.check(client_ip.key()) {
        metrics().rate_limited_requests.inc();
        warn!(client_ip = client_ip.key(), "Credential issuance rate limited");
        return Err(ApiError::rate_limited(
            "Too many credential requests",
            Some(state.issue_limiter.retry_after_secs()),
        ));
    }

    let credential = state.credentials.issue().await;
    Ok(Json(credential.into()))
}
