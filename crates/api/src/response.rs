//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use buffer::AdmitReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stream_core::{Credential, StructuredRecord};
use telemetry::ComponentHealthReport;

/// Response for an accepted intake request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmitResponse {
    pub success: bool,
    pub accepted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl AdmitResponse {
    pub fn from_report(report: &AdmitReport) -> Self {
        let errors: Vec<String> = report
            .rejected
            .iter()
            .map(|(index, e)| format!("record {}: {}", index, e))
            .collect();

        Self {
            success: true,
            accepted: report.accepted.len(),
            first_sequence: report.first_sequence(),
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }
}

/// Issued credential.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    pub access_token: String,
    pub expiry: DateTime<Utc>,
    pub scopes: Vec<String>,
}

impl From<Credential> for CredentialResponse {
    fn from(credential: Credential) -> Self {
        Self {
            scopes: credential
                .scopes
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            access_token: credential.access_token,
            expiry: credential.expiry,
        }
    }
}

/// Result of routing an object notification.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResponse {
    pub bucket: String,
    pub key: String,
    /// `extracted`, `empty`, `failed` or `dropped`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<StructuredRecord>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub analytical_store_connected: bool,
    pub backup_store_connected: bool,
    pub record_store_connected: bool,
    pub pending_records: u64,
    pub outstanding_batches: u64,
    pub components: Vec<ComponentHealthReport>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with error codes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
            retry_after: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn capacity(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            response: ErrorResponse::new(msg, "CAP_001"),
            retry_after,
        }
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(msg, "RATE_001"),
            retry_after,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
            retry_after: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        // Add Retry-After header for capacity and rate limit responses
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl From<stream_core::Error> for ApiError {
    fn from(err: stream_core::Error) -> Self {
        use stream_core::Error;

        match &err {
            Error::Auth {
                code,
                message,
                http_status,
            } => {
                let status =
                    StatusCode::from_u16(*http_status).unwrap_or(StatusCode::UNAUTHORIZED);
                ApiError::with_code(status, *code, message)
            }
            Error::Validation { code, message } => ApiError::validation(*code, vec![message.clone()]),
            Error::Capacity {
                message,
                retry_after,
            } => ApiError::capacity(message, *retry_after),
            Error::RateLimited {
                message,
                retry_after,
            } => ApiError::rate_limited(message, *retry_after),
            Error::Parse(message) => {
                ApiError::with_code(StatusCode::UNPROCESSABLE_ENTITY, "PARSE_001", message)
            }
            Error::Serialization(e) => ApiError::bad_request(e.to_string()),
            Error::Internal(_) => ApiError::internal(err.to_string()),
        }
    }
}
