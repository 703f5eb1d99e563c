//! Common test setup functions.

use api::{router, AppState, CredentialConfig};
use axum::Router;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use std::sync::Arc;
use storage::MemoryRecordStore;
use stream_core::{PipelineConfig, SealedBatch};
use worker::{BackupReference, FailureReporter, Pipeline, PipelineStores, WorkerConfig, WorkerScheduler};

use crate::mocks::MockAnalyticalStore;

/// Intake bucket name used by every test context.
pub const INTAKE_BUCKET: &str = "canvastream-intake";

/// Backup key prefix used by every test context.
pub const BACKUP_PREFIX: &str = "backup";

/// Pipeline settings for tests: long interval so only size or forced seals
/// happen, short backoff so retries finish quickly.
pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        buffer_interval_seconds: 60,
        backoff_base_ms: 5,
        delivery_timeout_ms: 2_000,
        extraction_timeout_ms: 2_000,
        stream_shards: 2,
        ..PipelineConfig::default()
    }
}

/// Test context wiring the real router and pipeline to in-memory stores.
///
/// This provides the same production code paths by:
/// - Using the real Axum router with all layers
/// - Using MockAnalyticalStore which implements AnalyticalStore
/// - Using in-memory object stores for backup and intake buckets
pub struct TestContext {
    pub pipeline: Arc<Pipeline>,
    pub analytical: MockAnalyticalStore,
    pub backup_store: Arc<InMemory>,
    pub intake_store: Arc<InMemory>,
    pub records: Arc<MemoryRecordStore>,
    pub reporter: Arc<FailureReporter>,
    pub scheduler: Arc<WorkerScheduler>,
    pub router: Router,
}

impl TestContext {
    /// Create a new test context with default test settings.
    pub async fn new() -> Self {
        Self::with_config(test_pipeline_config(), CredentialConfig::default()).await
    }

    /// Create a test context with custom pipeline and credential settings.
    pub async fn with_config(config: PipelineConfig, credentials: CredentialConfig) -> Self {
        telemetry::init_tracing_from_env();

        let analytical = MockAnalyticalStore::new();
        let backup_store = Arc::new(InMemory::new());
        let intake_store = Arc::new(InMemory::new());
        let records = Arc::new(MemoryRecordStore::new());
        let reporter = Arc::new(FailureReporter::new());

        let stores = PipelineStores {
            analytical: Arc::new(analytical.clone()),
            backup_store: backup_store.clone(),
            backup_prefix: BACKUP_PREFIX.to_string(),
            intake_store: intake_store.clone(),
            intake_bucket: INTAKE_BUCKET.to_string(),
            records: records.clone(),
            reporter: reporter.clone(),
        };

        let pipeline = Arc::new(
            Pipeline::start(&config, stores.clone()).expect("Failed to start pipeline"),
        );

        let scheduler = Arc::new(WorkerScheduler::new(
            WorkerConfig::default(),
            stores.probe_targets(),
            reporter.clone(),
            pipeline.shutdown_token().child_token(),
        ));

        let state = AppState::new(pipeline.clone(), &credentials);
        let router = router(state);

        Self {
            pipeline,
            analytical,
            backup_store,
            intake_store,
            records,
            reporter,
            scheduler,
            router,
        }
    }

    /// Seal every open batch and wait until each has been delivered or
    /// backed up.
    pub async fn drain(&self) {
        tokio::time::timeout(std::time::Duration::from_secs(10), self.pipeline.drain())
            .await
            .expect("Pipeline did not drain");
    }

    /// Every backup object, in key order.
    pub async fn backup_references(&self) -> Vec<BackupReference> {
        let prefix = Path::from(BACKUP_PREFIX);
        let mut keys: Vec<String> = self
            .backup_store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .expect("Failed to list backups");
        keys.sort();
        keys.into_iter().map(BackupReference::new).collect()
    }

    /// Every backed-up batch.
    pub async fn backed_up_batches(&self) -> Vec<SealedBatch> {
        let mut batches = Vec::new();
        for reference in self.backup_references().await {
            batches.push(
                self.pipeline
                    .backup()
                    .replay(&reference)
                    .await
                    .expect("Failed to replay backup"),
            );
        }
        batches
    }
}
