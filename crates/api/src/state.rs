//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;
use worker::Pipeline;

use crate::credentials::{CredentialConfig, CredentialIssuer};
use crate::middleware::rate_limit::{RateLimiter, SharedRateLimiter};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Running pipeline (intake, dispatcher, notification router)
    pub pipeline: Arc<Pipeline>,
    /// Producer credential issuer
    pub credentials: CredentialIssuer,
    /// Credential issuance limiter, keyed by client address
    pub issue_limiter: SharedRateLimiter,
    /// Intake limiter, keyed by access token
    pub intake_limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, config: &CredentialConfig) -> Self {
        Self {
            pipeline,
            credentials: CredentialIssuer::new(Duration::from_secs(config.ttl_seconds)),
            issue_limiter: Arc::new(RateLimiter::new(config.issue.clone())),
            intake_limiter: Arc::new(RateLimiter::new(config.intake.clone())),
        }
    }

    /// Start the rate limiter cleanup background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiters = [self.issue_limiter.clone(), self.intake_limiter.clone()];
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // 5 minutes
            loop {
                interval.tick().await;
                for limiter in &limiters {
                    limiter.cleanup(Duration::from_secs(600));
                }
            }
        })
    }
}
