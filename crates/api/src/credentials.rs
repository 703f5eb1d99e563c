//! Credential issuer.
//!
//! Issues anonymous producer credentials and validates them on intake.
//! Issued credentials live in a TTL cache; a token the cache no longer
//! holds is unknown.

use chrono::Utc;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stream_core::{AuthErrorCode, Credential, Error, ParsedToken, Result, Scope};
use telemetry::metrics;
use tracing::debug;

use crate::middleware::rate_limit::RateLimitConfig;

/// Maximum live credentials.
const CREDENTIAL_CACHE_MAX_CAPACITY: u64 = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Lifetime of an issued credential
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Issuance limit per client address
    #[serde(default = "default_issue_limit")]
    pub issue: RateLimitConfig,
    /// Intake limit per access token
    #[serde(default = "default_intake_limit")]
    pub intake: RateLimitConfig,
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_issue_limit() -> RateLimitConfig {
    RateLimitConfig { rate: 5, burst: 20 }
}

fn default_intake_limit() -> RateLimitConfig {
    RateLimitConfig {
        rate: 200,
        burst: 1000,
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            issue: default_issue_limit(),
            intake: default_intake_limit(),
        }
    }
}

#[derive(Clone)]
pub struct CredentialIssuer {
    cache: Cache<String, Credential>,
    ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(CREDENTIAL_CACHE_MAX_CAPACITY)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    /// Issue a temporary producer credential.
    pub async fn issue(&self) -> Credential {
        let ttl = chrono::Duration::seconds(self.ttl.as_secs() as i64);
        let credential = Credential::producer(Utc::now() + ttl);

        self.cache
            .insert(credential.access_token.clone(), credential.clone())
            .await;
        metrics().credentials_issued.inc();
        debug!(expiry = %credential.expiry, "Issued producer credential");

        credential
    }

    /// Check a presented token grants `scope`.
    pub async fn validate(&self, token: &ParsedToken, scope: Scope) -> Result<Credential> {
        let credential = self.cache.get(token.as_str()).await.ok_or_else(|| {
            Error::auth(AuthErrorCode::InvalidToken, "Unknown or expired access token")
        })?;

        credential.authorize(scope, Utc::now())?;
        Ok(credential)
    }

    pub async fn revoke(&self, token: &ParsedToken) {
        self.cache.invalidate(token.as_str()).await;
    }
}
