//! Health endpoints. Probes run in the worker scheduler; these only read
//! the last observed state.

use axum::{http::StatusCode, Json};
use telemetry::{health, metrics, HealthStatus};

use crate::response::HealthResponse;

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    let registry = health();
    let report = registry.report();
    let m = metrics();

    let status = match report.status {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
        HealthStatus::Unhealthy => "unhealthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        analytical_store_connected: registry.analytical_store.is_healthy(),
        backup_store_connected: registry.backup_store.is_healthy(),
        record_store_connected: registry.record_store.is_healthy(),
        pending_records: m.pending_records.get(),
        outstanding_batches: m.outstanding_batches.get(),
        components: report.components,
    })
}

/// GET /health/ready - 503 while neither delivery nor backup is possible.
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
