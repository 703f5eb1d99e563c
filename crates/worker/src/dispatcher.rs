//! Delivery dispatcher.
//!
//! This worker implements the delivery path:
//! 1. Receive a sealed batch from the buffering engine
//! 2. Transform it to the load payload
//! 3. Load it with bounded retries and exponential backoff
//! 4. On permanent failure, exhausted retries or shutdown, hand it to the
//!    backup writer
//!
//! Batches of one stream are delivered in order on that stream's lane;
//! lanes run in parallel.

use buffer::Backlog;
use clickhouse_client::{AnalyticalStore, DeliveryError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stream_core::{LoadPayload, PipelineConfig, SealedBatch};
use telemetry::metrics;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backup::{BackupReference, BackupWriter};
use crate::failures::{FailureReport, FailureReporter};

/// Retry settings for delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per batch before escalating to backup
    pub retry_budget: u32,
    pub backoff_base: Duration,
    /// Timeout of one attempt; expiry counts as a transient failure
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            retry_budget: config.retry_budget.max(1),
            backoff_base: config.backoff_base(),
            attempt_timeout: config.delivery_timeout(),
        }
    }

    /// Wait after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    TransientFailure(String),
    PermanentFailure(String),
}

/// A single delivery attempt. Kept in memory only, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub stream: String,
    pub batch_sequence: u64,
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

/// Why a batch went to backup instead of the analytical store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    RetriesExhausted,
    Permanent,
    Shutdown,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetriesExhausted => "retries_exhausted",
            Self::Permanent => "permanent_failure",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Final outcome of dispatching a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered {
        attempts: u32,
    },
    BackedUp {
        reference: BackupReference,
        reason: EscalationReason,
        attempts: u32,
    },
    /// Backup failed too; the failure has been reported.
    Lost {
        reason: EscalationReason,
        error: String,
    },
}

pub struct Dispatcher {
    store: Arc<dyn AnalyticalStore>,
    backup: Arc<BackupWriter>,
    reporter: Arc<FailureReporter>,
    backlog: Arc<Backlog>,
    policy: RetryPolicy,
    lane_capacity: usize,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn AnalyticalStore>,
        backup: Arc<BackupWriter>,
        reporter: Arc<FailureReporter>,
        backlog: Arc<Backlog>,
        policy: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            backup,
            reporter,
            backlog,
            policy,
            lane_capacity: 16,
            shutdown,
        }
    }

    pub fn with_lane_capacity(mut self, capacity: usize) -> Self {
        self.lane_capacity = capacity.max(1);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One load of the payload under the attempt timeout.
    pub async fn attempt(&self, payload: &LoadPayload, attempt_number: u32) -> DeliveryAttempt {
        let m = metrics();
        m.delivery_attempts.inc();
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.policy.attempt_timeout, self.store.load(payload)).await
        {
            Ok(Ok(())) => AttemptOutcome::Success,
            Ok(Err(DeliveryError::Transient(e))) => AttemptOutcome::TransientFailure(e),
            Ok(Err(DeliveryError::Permanent(e))) => AttemptOutcome::PermanentFailure(e),
            Err(_) => AttemptOutcome::TransientFailure(format!(
                "attempt timed out after {}ms",
                self.policy.attempt_timeout.as_millis()
            )),
        };

        m.delivery_latency_ms.observe(start.elapsed().as_millis() as u64);
        match &outcome {
            AttemptOutcome::Success => {}
            AttemptOutcome::TransientFailure(_) => m.delivery_transient_failures.inc(),
            AttemptOutcome::PermanentFailure(_) => m.delivery_permanent_failures.inc(),
        }

        DeliveryAttempt {
            stream: payload.stream.clone(),
            batch_sequence: payload.batch_sequence,
            attempt_number,
            outcome,
        }
    }

    /// Deliver a batch, escalating to backup when delivery cannot succeed.
    pub async fn deliver(&self, batch: &SealedBatch) -> DispatchOutcome {
        let payload = match LoadPayload::from_batch(batch) {
            Ok(payload) => payload,
            Err(e) => {
                error!(batch = %batch.label(), error = %e, "Failed to build load payload");
                return self.escalate(batch, EscalationReason::Permanent, 0).await;
            }
        };

        let mut attempts = 0;
        for attempt_number in 1..=self.policy.retry_budget {
            if self.shutdown.is_cancelled() {
                return self.escalate(batch, EscalationReason::Shutdown, attempts).await;
            }

            attempts = attempt_number;
            let attempt = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    return self.escalate(batch, EscalationReason::Shutdown, attempts).await;
                }
                attempt = self.attempt(&payload, attempt_number) => attempt,
            };

            match attempt.outcome {
                AttemptOutcome::Success => {
                    let m = metrics();
                    m.batches_delivered.inc();
                    m.records_delivered.inc_by(batch.len() as u64);
                    debug!(
                        stream = %batch.metadata.stream,
                        batch_seq = batch.metadata.sequence,
                        records = batch.len(),
                        attempt = attempt_number,
                        "Batch delivered"
                    );
                    return DispatchOutcome::Delivered { attempts };
                }
                AttemptOutcome::PermanentFailure(e) => {
                    error!(
                        stream = %batch.metadata.stream,
                        batch_seq = batch.metadata.sequence,
                        attempt = attempt_number,
                        error = %e,
                        "Permanent delivery failure"
                    );
                    return self.escalate(batch, EscalationReason::Permanent, attempts).await;
                }
                AttemptOutcome::TransientFailure(e) => {
                    if attempt_number == self.policy.retry_budget {
                        warn!(
                            stream = %batch.metadata.stream,
                            batch_seq = batch.metadata.sequence,
                            attempt = attempt_number,
                            error = %e,
                            "Delivery failed, retry budget exhausted"
                        );
                        break;
                    }

                    let backoff = self.policy.backoff_for(attempt_number);
                    warn!(
                        stream = %batch.metadata.stream,
                        batch_seq = batch.metadata.sequence,
                        attempt = attempt_number,
                        backoff_ms = %backoff.as_millis(),
                        error = %e,
                        "Retrying delivery"
                    );

                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            return self.escalate(batch, EscalationReason::Shutdown, attempts).await;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        self.escalate(batch, EscalationReason::RetriesExhausted, attempts)
            .await
    }

    /// Push a replayed batch through the delivery path again.
    ///
    /// Used by recovery tooling; the batch is outside backlog accounting.
    pub async fn redeliver(&self, batch: &SealedBatch) -> DispatchOutcome {
        info!(batch = %batch.label(), records = batch.len(), "Redelivering batch");
        self.deliver(batch).await
    }

    async fn escalate(
        &self,
        batch: &SealedBatch,
        reason: EscalationReason,
        attempts: u32,
    ) -> DispatchOutcome {
        match self.backup.persist(batch).await {
            Ok(reference) => {
                self.reporter
                    .report(FailureReport::BatchBackedUp {
                        stream: batch.metadata.stream.clone(),
                        batch_sequence: batch.metadata.sequence,
                        records: batch.len(),
                        reason: reason.as_str().to_string(),
                        backup_key: reference.key().to_string(),
                    })
                    .await;
                DispatchOutcome::BackedUp {
                    reference,
                    reason,
                    attempts,
                }
            }
            Err(e) => DispatchOutcome::Lost {
                reason,
                error: e.to_string(),
            },
        }
    }

    /// Consume sealed batches until the hand-off channel closes, then wait
    /// for every lane to settle its batches.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<SealedBatch>) {
        info!(
            retry_budget = self.policy.retry_budget,
            backoff_base_ms = %self.policy.backoff_base.as_millis(),
            "Dispatcher starting"
        );

        let mut lanes: HashMap<String, mpsc::Sender<SealedBatch>> = HashMap::new();
        let mut tasks = JoinSet::new();

        while let Some(batch) = rx.recv().await {
            let stream = batch.metadata.stream.clone();
            let lane = lanes.entry(stream.clone()).or_insert_with(|| {
                let (tx, lane_rx) = mpsc::channel(self.lane_capacity);
                tasks.spawn(self.clone().run_lane(stream, lane_rx));
                tx
            });

            if let Err(e) = lane.send(batch).await {
                // Lane task ended early; deliver inline so the batch still settles
                let batch = e.0;
                error!(batch = %batch.label(), "Delivery lane closed");
                self.settle(&batch).await;
            }
        }

        drop(lanes);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Delivery lane panicked");
            }
        }
        info!("Dispatcher stopped");
    }

    async fn run_lane(self: Arc<Self>, stream: String, mut rx: mpsc::Receiver<SealedBatch>) {
        debug!(stream = %stream, "Delivery lane started");
        while let Some(batch) = rx.recv().await {
            self.settle(&batch).await;
        }
    }

    async fn settle(&self, batch: &SealedBatch) {
        let outcome = self.deliver(batch).await;
        if let DispatchOutcome::Lost { reason, error } = &outcome {
            error!(
                batch = %batch.label(),
                records = batch.len(),
                reason = reason.as_str(),
                error = %error,
                "Batch lost after backup failure"
            );
        }
        self.backlog.batch_settled(batch.len());
    }
}
