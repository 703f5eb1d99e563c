//! Object store health checks.

use object_store::path::Path;
use object_store::ObjectStore;
use telemetry::ComponentHealth;
use tracing::warn;

/// Probe an object store with a HEAD on a sentinel key.
///
/// A not-found answer means the bucket is reachable.
pub async fn check_object_store(store: &dyn ObjectStore, component: &ComponentHealth) -> bool {
    match store.head(&Path::from("_health")).await {
        Ok(_) | Err(object_store::Error::NotFound { .. }) => {
            component.set_healthy();
            true
        }
        Err(e) => {
            warn!(component = component.name(), error = %e, "Object store health check failed");
            component.set_unhealthy(e.to_string());
            false
        }
    }
}
