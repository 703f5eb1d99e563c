//! Backup writer.
//!
//! Sealed batches that could not be delivered are written verbatim to the
//! backup bucket under a deterministic key. Objects are never deleted by the
//! pipeline; replay is driven by external recovery tooling.

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::paths::{format_backup_path, format_backup_stream_prefix};
use stream_core::SealedBatch;
use telemetry::metrics;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::failures::{FailureReport, FailureReporter};

/// Key of a backup object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupReference(String);

impl BackupReference {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BackupReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup object not found: {0}")]
    NotFound(String),

    #[error("backup object {0} already holds a different batch")]
    Conflict(String),

    #[error("backup store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("backup serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct BackupWriter {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    reporter: Arc<FailureReporter>,
}

impl BackupWriter {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        reporter: Arc<FailureReporter>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            reporter,
        }
    }

    /// Where `batch` is (or would be) backed up.
    pub fn reference_for(&self, batch: &SealedBatch) -> BackupReference {
        BackupReference(format_backup_path(
            &self.prefix,
            &batch.metadata.stream,
            batch.metadata.opened_at,
            batch.metadata.epoch,
            batch.metadata.sequence,
        ))
    }

    /// Write the batch to the backup store.
    ///
    /// A failure is reported to operators before it is returned; the batch
    /// is lost to the pipeline at that point.
    pub async fn persist(&self, batch: &SealedBatch) -> Result<BackupReference, BackupError> {
        let reference = self.reference_for(batch);

        match self.write(&reference, batch).await {
            Ok(()) => {
                let m = metrics();
                m.batches_backed_up.inc();
                m.records_backed_up.inc_by(batch.len() as u64);
                info!(
                    stream = %batch.metadata.stream,
                    batch_seq = batch.metadata.sequence,
                    records = batch.len(),
                    key = %reference,
                    "Batch backed up"
                );
                Ok(reference)
            }
            Err(e) => {
                metrics().backup_failures.inc();
                error!(
                    stream = %batch.metadata.stream,
                    batch_seq = batch.metadata.sequence,
                    records = batch.len(),
                    error = %e,
                    "Backup failed"
                );
                self.reporter
                    .report(FailureReport::BackupFailed {
                        stream: batch.metadata.stream.clone(),
                        batch_sequence: batch.metadata.sequence,
                        records: batch.len(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Create-only write. An existing object counts as written only when it
    /// holds this exact batch.
    async fn write(&self, reference: &BackupReference, batch: &SealedBatch) -> Result<(), BackupError> {
        let body = Bytes::from(serde_json::to_vec(batch)?);
        let path = Path::from(reference.key());
        let create = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };

        match self
            .store
            .put_opts(&path, PutPayload::from_bytes(body.clone()), create)
            .await
        {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => {
                let existing = self.store.get(&path).await?.bytes().await?;
                if existing == body {
                    debug!(key = %reference, "Batch already backed up");
                    Ok(())
                } else {
                    Err(BackupError::Conflict(reference.key().to_string()))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a backed-up batch back.
    pub async fn replay(&self, reference: &BackupReference) -> Result<SealedBatch, BackupError> {
        let result = self
            .store
            .get(&Path::from(reference.key()))
            .await
            .map_err(|e| match e {
                object_store::Error::NotFound { path, .. } => BackupError::NotFound(path),
                other => BackupError::Store(other),
            })?;
        let bytes = result.bytes().await?;
        let batch: SealedBatch = serde_json::from_slice(&bytes)?;

        debug!(key = %reference, records = batch.len(), "Replayed backup");
        Ok(batch)
    }

    /// Backups of one stream, oldest batch first.
    pub async fn list(&self, stream: &str) -> Result<Vec<BackupReference>, BackupError> {
        let prefix = Path::from(format_backup_stream_prefix(&self.prefix, stream));
        let objects: Vec<_> = self.store.list(Some(&prefix)).try_collect().await?;

        let mut references: Vec<BackupReference> = objects
            .into_iter()
            .map(|meta| BackupReference(meta.location.to_string()))
            .collect();
        // Zero-padded epochs and sequences make file name order batch order
        // within a run
        references.sort_by(|a, b| file_name(a).cmp(file_name(b)));
        Ok(references)
    }
}

fn file_name(reference: &BackupReference) -> &str {
    reference.key().rsplit('/').next().unwrap_or(reference.key())
}
