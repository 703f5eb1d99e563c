//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use stream_core::{extract_bearer, ParsedToken};

use crate::response::ApiError;

/// Bearer token presented by a producer, format-checked only.
///
/// Handlers validate it against the issuer for the scope they need.
#[derive(Debug, Clone)]
pub struct BearerToken(pub ParsedToken);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        Ok(BearerToken(extract_bearer(auth_header)?))
    }
}

/// Client address as reported by the fronting proxy.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    /// Rate limit key; requests without an address share one bucket.
    pub fn key(&self) -> &str {
        self.0.as_deref().unwrap_or("unknown")
    }

    fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        // Left-most X-Forwarded-For entry is the original client
        let forwarded = header("X-Forwarded-For")
            .and_then(|chain| chain.split(',').next())
            .map(str::trim);

        let ip = forwarded
            .or_else(|| header("X-Real-IP").map(str::trim))
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);
        ClientIp(ip)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
