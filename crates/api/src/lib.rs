//! HTTP API layer for the canvastream pipeline.

pub mod credentials;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use credentials::{CredentialConfig, CredentialIssuer};
pub use routes::router;
pub use state::AppState;
