//! Producer credentials.
//!
//! Producers are anonymous. They exchange nothing for a short-lived access
//! token that is only good for writing to intake:
//! - Token format validation (`cst_<32 hex>`)
//! - Scopes granted to producer tokens
//! - Bearer token extraction from request headers

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::{AuthErrorCode, Error, Result};

/// Access token prefix.
pub const TOKEN_PREFIX: &str = "cst_";

/// Access token pattern.
pub const TOKEN_PATTERN: &str = r"^cst_[a-f0-9]{32}$";

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("invalid token pattern"));

/// Permission carried by a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Admit event records
    #[serde(rename = "records:write")]
    RecordsWrite,
    /// Upload record files to the intake bucket
    #[serde(rename = "uploads:write")]
    UploadsWrite,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordsWrite => "records:write",
            Self::UploadsWrite => "uploads:write",
        }
    }

    /// Scopes granted to anonymous producers.
    pub fn producer() -> Vec<Scope> {
        vec![Scope::RecordsWrite, Scope::UploadsWrite]
    }
}

/// An issued, temporary credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    pub expiry: DateTime<Utc>,
    pub scopes: Vec<Scope>,
}

impl Credential {
    /// Mint a new producer credential valid until `expiry`.
    pub fn producer(expiry: DateTime<Utc>) -> Self {
        Self {
            access_token: format!("{}{}", TOKEN_PREFIX, Uuid::new_v4().simple()),
            expiry,
            scopes: Scope::producer(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    pub fn allows(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    /// Check the credential grants `scope` at `now`.
    pub fn authorize(&self, scope: Scope, now: DateTime<Utc>) -> Result<()> {
        if self.is_expired(now) {
            return Err(Error::auth(
                AuthErrorCode::InvalidToken,
                "Access token has expired",
            ));
        }
        if !self.allows(scope) {
            return Err(Error::auth(
                AuthErrorCode::InsufficientScope,
                format!("Access token lacks scope {}", scope.as_str()),
            ));
        }
        Ok(())
    }
}

/// Access token from a request, validated for format only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    raw: String,
}

impl ParsedToken {
    /// Parse and validate a token's format.
    pub fn parse(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::auth(
                AuthErrorCode::MissingToken,
                "Access token is required",
            ));
        }

        if !TOKEN_REGEX.is_match(token) {
            return Err(Error::auth(
                AuthErrorCode::InvalidFormat,
                "Invalid access token format",
            ));
        }

        Ok(Self {
            raw: token.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Extract the access token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer(auth_header: Option<&str>) -> Result<ParsedToken> {
    match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => ParsedToken::parse(token.trim()),
        None => Err(Error::auth(
            AuthErrorCode::MissingToken,
            "Access token is required",
        )),
    }
}
