//! canvastream
//!
//! Durable delivery pipeline for canvas interaction events:
//! - Producer credentials and record intake with backpressure
//! - Per-stream batching sealed on interval or size
//! - Bulk loads into ClickHouse with bounded retries, backup on failure
//! - Extraction of uploaded record files into the structured record store

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState, CredentialConfig};
use clickhouse_client::{ClickHouseAnalyticalStore, ClickHouseClient, ClickHouseConfig, ClickHouseRecordStore};
use storage::{build_object_store, MemoryRecordStore, ObjectStoreConfig, RecordStore};
use stream_core::PipelineConfig;
use telemetry::init_tracing_from_env;
use worker::{FailureReporter, Pipeline, PipelineStores, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    pipeline: PipelineConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    storage: StorageConfig,

    #[serde(default)]
    record_store: RecordStoreConfig,

    #[serde(default)]
    credentials: CredentialConfig,

    #[serde(default)]
    failures: FailuresConfig,
}

/// Object stores for backups and uploaded record files. Kept apart so
/// producer-facing credentials never reach the backup bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageConfig {
    #[serde(default = "ObjectStoreConfig::backup_default")]
    backup: ObjectStoreConfig,
    #[serde(default = "ObjectStoreConfig::intake_default")]
    intake: ObjectStoreConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backup: ObjectStoreConfig::backup_default(),
            intake: ObjectStoreConfig::intake_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordStoreBackend {
    #[default]
    Memory,
    Clickhouse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecordStoreConfig {
    #[serde(default)]
    backend: RecordStoreBackend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FailuresConfig {
    /// Operator webhook receiving failure reports as JSON
    #[serde(default)]
    webhook_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            pipeline: PipelineConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            storage: StorageConfig::default(),
            record_store: RecordStoreConfig::default(),
            credentials: CredentialConfig::default(),
            failures: FailuresConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting canvastream v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;

    info!(
        clickhouse_url = %config.clickhouse.url,
        backup_bucket = %config.storage.backup.bucket,
        intake_bucket = %config.storage.intake.bucket,
        record_store = ?config.record_store.backend,
        "Loaded configuration"
    );

    // Initialize ClickHouse client
    let clickhouse = ClickHouseClient::new(config.clickhouse.clone())
        .context("Failed to create ClickHouse client")?;

    // Initialize ClickHouse schema
    if let Err(e) = clickhouse_client::schema::init_schema(&clickhouse).await {
        error!("Failed to initialize ClickHouse schema: {}", e);
        // Continue anyway; delivery failures fall back to backup
    }

    let backup_store =
        build_object_store(&config.storage.backup).context("Failed to create backup store")?;
    let intake_store =
        build_object_store(&config.storage.intake).context("Failed to create intake store")?;

    let records: Arc<dyn RecordStore> = match config.record_store.backend {
        RecordStoreBackend::Memory => {
            warn!("Using in-memory record store; extracted records are lost on restart");
            Arc::new(MemoryRecordStore::new())
        }
        RecordStoreBackend::Clickhouse => Arc::new(ClickHouseRecordStore::new(clickhouse.clone())),
    };

    let reporter = Arc::new(FailureReporter::from_webhook(
        config.failures.webhook_url.clone(),
    ));

    let stores = PipelineStores {
        analytical: Arc::new(ClickHouseAnalyticalStore::new(clickhouse.clone())),
        backup_store,
        backup_prefix: config.storage.backup.prefix.clone(),
        intake_store,
        intake_bucket: config.storage.intake.bucket.clone(),
        records,
        reporter: reporter.clone(),
    };

    // Start the pipeline
    let pipeline = Arc::new(
        Pipeline::start(&config.pipeline, stores.clone()).context("Failed to start pipeline")?,
    );

    // Start background workers
    let scheduler = Arc::new(WorkerScheduler::new(
        WorkerConfig::default(),
        stores.probe_targets(),
        reporter,
        pipeline.shutdown_token().child_token(),
    ));
    if !scheduler.check_health().await {
        warn!("Not all stores are reachable at startup");
    }
    let _worker_handles = scheduler.start();

    // Create application state
    let state = AppState::new(pipeline.clone(), &config.credentials);

    // Start rate limiter cleanup background task
    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();
    info!("Started rate limiter cleanup task (every 5 minutes)");

    // Create router
    let app = router(state);

    // Start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Flush open batches; anything not yet delivered goes to backup
    info!("Shutting down...");
    pipeline.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CANVASTREAM")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested config from environment
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(url) = std::env::var("CANVASTREAM_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("CANVASTREAM_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("CANVASTREAM_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("CANVASTREAM_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Ok(bucket) = std::env::var("CANVASTREAM_BACKUP_BUCKET") {
        config.storage.backup.bucket = bucket;
    }
    if let Ok(bucket) = std::env::var("CANVASTREAM_INTAKE_BUCKET") {
        config.storage.intake.bucket = bucket;
    }
    if let Ok(url) = std::env::var("CANVASTREAM_FAILURE_WEBHOOK_URL") {
        config.failures.webhook_url = Some(url);
    }

    config
        .pipeline
        .check()
        .context("Invalid pipeline configuration")?;

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
