//! API routes.

pub mod credentials;
pub mod health;
pub mod notifications;
pub mod records;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use stream_core::limits::MAX_REQUEST_SIZE_BYTES;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/credentials", post(credentials::issue_handler))
        .route("/v1/records", post(records::records_handler))
        .route("/v1/uploads/*key", put(uploads::upload_handler))
        .route("/v1/notifications", post(notifications::notification_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        // Handlers enforce the exact limits; this only caps what gets buffered
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE_BYTES * 2))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
