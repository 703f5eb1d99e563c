//! Notification router.
//!
//! Matches object storage notifications against a static subscription and
//! runs the extraction worker once per matched event.

use serde_json::Value;
use std::sync::Arc;
use storage::events::{EVENT_CREATED, SOURCE_OBJECT_STORAGE};
use storage::ObjectEvent;
use stream_core::{Result, StructuredRecord};
use telemetry::metrics;
use tracing::debug;

use crate::extraction::{ExtractionError, ExtractionWorker};

/// Which notifications reach the extraction worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub source: String,
    pub event_type: String,
    pub bucket: String,
}

impl Subscription {
    /// Object creation in the intake bucket.
    pub fn intake(bucket: impl Into<String>) -> Self {
        Self {
            source: SOURCE_OBJECT_STORAGE.to_string(),
            event_type: EVENT_CREATED.to_string(),
            bucket: bucket.into(),
        }
    }

    pub fn matches(&self, event: &ObjectEvent) -> bool {
        event.source == self.source
            && event.event_type == self.event_type
            && event.bucket == self.bucket
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// No subscription matched.
    Dropped,
    Extracted(Option<StructuredRecord>),
    Failed(ExtractionError),
}

pub struct NotificationRouter {
    subscription: Subscription,
    worker: Arc<ExtractionWorker>,
}

impl NotificationRouter {
    pub fn new(subscription: Subscription, worker: Arc<ExtractionWorker>) -> Self {
        Self {
            subscription,
            worker,
        }
    }

    /// Subscribed to creations in the worker's own bucket.
    pub fn for_worker(worker: Arc<ExtractionWorker>) -> Self {
        Self::new(Subscription::intake(worker.bucket()), worker)
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub async fn route(&self, event: &ObjectEvent) -> RouteOutcome {
        let m = metrics();
        m.notifications_received.inc();

        if !self.subscription.matches(event) {
            m.notifications_dropped.inc();
            debug!(
                source = %event.source,
                event_type = %event.event_type,
                bucket = %event.bucket,
                "Dropping unmatched notification"
            );
            return RouteOutcome::Dropped;
        }

        match self.worker.extract(&event.object()).await {
            Ok(record) => RouteOutcome::Extracted(record),
            Err(e) => RouteOutcome::Failed(e),
        }
    }

    /// Parse a raw notification body, then route it.
    pub async fn route_value(&self, value: Value) -> Result<RouteOutcome> {
        let event = ObjectEvent::parse(value)?;
        Ok(self.route(&event).await)
    }
}
