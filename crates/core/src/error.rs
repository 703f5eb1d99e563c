//! Unified error types for the pipeline.
//!
//! Error codes:
//! - VALID_001-003: Validation errors (rejected at intake, never retried)
//! - CAP_001: Capacity errors (backlog bound exceeded, retryable)
//! - AUTH_001-004: Credential errors
//! - RATE_001: Rate limit errors
//! - PARSE_001: Uploaded record file does not match the record schema

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Credential error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// AUTH_001: Access token is required
    MissingToken,
    /// AUTH_002: Invalid access token format
    InvalidFormat,
    /// AUTH_003: Unknown or expired access token
    InvalidToken,
    /// AUTH_004: Token lacks the scope for this operation
    InsufficientScope,
}

impl AuthErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "AUTH_001",
            Self::InvalidFormat => "AUTH_002",
            Self::InvalidToken => "AUTH_003",
            Self::InsufficientScope => "AUTH_004",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingToken | Self::InvalidFormat | Self::InvalidToken => 401,
            Self::InsufficientScope => 403,
        }
    }
}

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Missing or malformed field / invalid JSON
    InvalidFormat,
    /// VALID_002: Request exceeds the record count or byte limit
    BatchTooLarge,
    /// VALID_003: Single record exceeds the size limit
    RecordTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::BatchTooLarge => "VALID_002",
            Self::RecordTooLarge => "VALID_003",
        }
    }
}

/// Unified error type for the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential error with code.
    #[error("[{code}] {message}")]
    Auth {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Validation error with code.
    #[error("[{code}] {message}")]
    Validation {
        code: &'static str,
        message: String,
    },

    /// The open batch plus the undelivered backlog exceed the configured bound.
    #[error("[CAP_001] {message}")]
    Capacity {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("[RATE_001] {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// Uploaded object body does not match the record schema.
    #[error("[PARSE_001] {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a credential error.
    pub fn auth(code: AuthErrorCode, msg: impl Into<String>) -> Self {
        Self::Auth {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a VALID_001 validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_code(ValidationErrorCode::InvalidFormat, msg)
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity {
            message: msg.into(),
            retry_after: Some(1),
        }
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimited {
            message: msg.into(),
            retry_after,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a producer may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Capacity { .. } | Self::RateLimited { .. })
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Auth { http_status, .. } => *http_status,
            Self::Validation { .. } => 400,
            Self::Capacity { .. } => 503,
            Self::RateLimited { .. } => 429,
            Self::Parse(_) => 422,
            Self::Serialization(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Auth { code, .. } => Some(code),
            Self::Validation { code, .. } => Some(code),
            Self::Capacity { .. } => Some("CAP_001"),
            Self::RateLimited { .. } => Some("RATE_001"),
            Self::Parse(_) => Some("PARSE_001"),
            _ => None,
        }
    }

    /// Seconds a producer should wait before retrying, if any.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Capacity { retry_after, .. } | Self::RateLimited { retry_after, .. } => {
                *retry_after
            }
            _ => None,
        }
    }
}
