//! Pipeline wiring: intake → buffering engine → dispatcher → backup, plus the
//! notification router feeding the extraction worker.

use object_store::ObjectStore;
use std::sync::Arc;
use storage::RecordStore;
use stream_core::{PipelineConfig, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use buffer::{Backlog, BufferEngine, Intake};
use clickhouse_client::AnalyticalStore;

use crate::backup::BackupWriter;
use crate::dispatcher::{Dispatcher, RetryPolicy};
use crate::extraction::ExtractionWorker;
use crate::failures::FailureReporter;
use crate::router::NotificationRouter;
use crate::scheduler::ProbeTargets;

/// External stores the pipeline runs against.
#[derive(Clone)]
pub struct PipelineStores {
    pub analytical: Arc<dyn AnalyticalStore>,
    pub backup_store: Arc<dyn ObjectStore>,
    pub backup_prefix: String,
    pub intake_store: Arc<dyn ObjectStore>,
    pub intake_bucket: String,
    pub records: Arc<dyn RecordStore>,
    pub reporter: Arc<FailureReporter>,
}

impl PipelineStores {
    pub fn probe_targets(&self) -> ProbeTargets {
        ProbeTargets {
            analytical: self.analytical.clone(),
            backup: self.backup_store.clone(),
            records: self.records.clone(),
        }
    }
}

/// A running pipeline.
pub struct Pipeline {
    intake: Arc<Intake>,
    engine: Arc<BufferEngine>,
    dispatcher: Arc<Dispatcher>,
    backup: Arc<BackupWriter>,
    router: Arc<NotificationRouter>,
    stores: PipelineStores,
    dispatch_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Validate the configuration and start the stream actors and the
    /// dispatcher.
    pub fn start(config: &PipelineConfig, stores: PipelineStores) -> Result<Self> {
        config.check()?;

        let shutdown = CancellationToken::new();
        let backlog = Arc::new(Backlog::new(config));
        let (handoff, handoff_rx) = mpsc::channel(config.max_outstanding_batches);

        let engine = Arc::new(BufferEngine::start(config, handoff, backlog.clone()));
        let intake = Arc::new(Intake::new(engine.clone(), backlog.clone()));

        let backup = Arc::new(BackupWriter::new(
            stores.backup_store.clone(),
            stores.backup_prefix.clone(),
            stores.reporter.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            stores.analytical.clone(),
            backup.clone(),
            stores.reporter.clone(),
            backlog,
            RetryPolicy::from_config(config),
            shutdown.child_token(),
        ));
        let dispatch_task = tokio::spawn(dispatcher.clone().run(handoff_rx));

        let worker = Arc::new(ExtractionWorker::new(
            stores.intake_store.clone(),
            stores.intake_bucket.clone(),
            stores.records.clone(),
            stores.reporter.clone(),
            config.extraction_timeout(),
        ));
        let router = Arc::new(NotificationRouter::for_worker(worker));

        info!(
            streams = config.stream_shards,
            retry_budget = config.retry_budget,
            capacity_bound = config.capacity_bound,
            "Pipeline started"
        );

        Ok(Self {
            intake,
            engine,
            dispatcher,
            backup,
            router,
            stores,
            dispatch_task: parking_lot::Mutex::new(Some(dispatch_task)),
            shutdown,
        })
    }

    pub fn intake(&self) -> &Arc<Intake> {
        &self.intake
    }

    pub fn engine(&self) -> &Arc<BufferEngine> {
        &self.engine
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn backup(&self) -> &Arc<BackupWriter> {
        &self.backup
    }

    pub fn router(&self) -> &Arc<NotificationRouter> {
        &self.router
    }

    pub fn stores(&self) -> &PipelineStores {
        &self.stores
    }

    /// Parent of every background task's cancellation token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Seal open batches and wait until the dispatcher has settled every
    /// batch sealed so far.
    pub async fn drain(&self) {
        self.engine.flush().await;
        let backlog = self.intake.backlog();
        while backlog.outstanding_batches() > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    /// Stop the pipeline. Open batches are flushed; batches still waiting
    /// for delivery go to the backup store.
    pub async fn shutdown(&self) {
        info!("Pipeline shutting down");
        self.engine.shutdown().await;
        self.shutdown.cancel();

        let task = self.dispatch_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Dispatcher task panicked");
            }
        }
        info!("Pipeline stopped");
    }
}
