//! Worker scheduler for background tasks.

use object_store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clickhouse_client::AnalyticalStore;
use storage::health::check_object_store;
use storage::RecordStore;
use telemetry::{health, metrics};

use crate::failures::FailureReporter;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Metrics log interval
    pub metrics_log_interval: Duration,
    /// Store health check interval
    pub health_check_interval: Duration,
    /// Alert check interval
    pub alert_check_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            metrics_log_interval: Duration::from_secs(60),  // 1 minute
            health_check_interval: Duration::from_secs(15), // 15 seconds
            alert_check_interval: Duration::from_secs(60),  // 1 minute
        }
    }
}

/// Stores the health worker probes.
#[derive(Clone)]
pub struct ProbeTargets {
    pub analytical: Arc<dyn AnalyticalStore>,
    pub backup: Arc<dyn ObjectStore>,
    pub records: Arc<dyn RecordStore>,
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    targets: ProbeTargets,
    reporter: Arc<FailureReporter>,
    shutdown: CancellationToken,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        targets: ProbeTargets,
        reporter: Arc<FailureReporter>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            targets,
            reporter,
            shutdown,
        }
    }

    /// Starts all background workers. They stop when the shutdown token is
    /// cancelled.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        // Health check worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_health_checks().await;
        }));

        // Metrics log worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log().await;
        }));

        // Alert worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_alert_worker().await;
        }));

        info!("Background workers started");
        handles
    }

    /// Probe every store once and record the result in the health registry.
    pub async fn check_health(&self) -> bool {
        let registry = health();

        let analytical = match self.targets.analytical.ping().await {
            Ok(()) => {
                registry.analytical_store.set_healthy();
                true
            }
            Err(e) => {
                warn!(error = %e, "Analytical store health check failed");
                registry.analytical_store.set_unhealthy(e.to_string());
                false
            }
        };

        let backup = check_object_store(self.targets.backup.as_ref(), &registry.backup_store).await;

        let records = match self.targets.records.ping().await {
            Ok(()) => {
                registry.record_store.set_healthy();
                true
            }
            Err(e) => {
                warn!(error = %e, "Record store health check failed");
                registry.record_store.set_unhealthy(e.to_string());
                false
            }
        };

        analytical && backup && records
    }

    async fn run_health_checks(&self) {
        let mut ticker = interval(self.config.health_check_interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_health().await;
                }
            }
        }
    }

    async fn run_metrics_log(&self) {
        let mut ticker = interval(self.config.metrics_log_interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let s = metrics().snapshot();
                    info!(
                        records_admitted = s.records_admitted,
                        records_rejected_capacity = s.records_rejected_capacity,
                        batches_delivered = s.batches_delivered,
                        batches_backed_up = s.batches_backed_up,
                        backup_failures = s.backup_failures,
                        extractions_failed = s.extractions_failed,
                        delivery_latency_mean_ms = s.delivery_latency_mean_ms,
                        pending_records = s.pending_records,
                        outstanding_batches = s.outstanding_batches,
                        "Pipeline metrics"
                    );
                }
            }
        }
    }

    async fn run_alert_worker(&self) {
        let mut ticker = interval(self.config.alert_check_interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.reporter.check_and_alert().await;
                }
            }
        }
    }
}
