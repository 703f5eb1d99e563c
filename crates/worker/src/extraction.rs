//! Extraction worker.
//!
//! Reads an uploaded record file from the intake bucket, parses it into at
//! most one structured record and writes that record to the record store.
//! Failures are reported once and never retried; the uploaded object stays
//! where it is.

use object_store::path::Path;
use object_store::ObjectStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storage::{ObjectRef, RecordStore};
use stream_core::StructuredRecord;
use telemetry::metrics;
use thiserror::Error;
use tracing::{debug, warn};

use crate::failures::{FailureReport, FailureReporter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The object is not a valid record file.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("object not found: {0}")]
    NotFound(String),

    /// Timeout or an unreachable store.
    #[error("transient extraction failure: {0}")]
    Transient(String),

    #[error("store error: {0}")]
    Store(String),
}

impl ExtractionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::NotFound(_) => "not_found",
            Self::Transient(_) => "transient",
            Self::Store(_) => "store",
        }
    }
}

pub struct ExtractionWorker {
    intake: Arc<dyn ObjectStore>,
    bucket: String,
    records: Arc<dyn RecordStore>,
    reporter: Arc<FailureReporter>,
    timeout: Duration,
}

impl ExtractionWorker {
    pub fn new(
        intake: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        records: Arc<dyn RecordStore>,
        reporter: Arc<FailureReporter>,
        timeout: Duration,
    ) -> Self {
        Self {
            intake,
            bucket: bucket.into(),
            records,
            reporter,
            timeout,
        }
    }

    /// Bucket this worker reads from.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Extract one uploaded object.
    ///
    /// `Ok(None)` means the file held no record. Any error has already been
    /// reported when this returns.
    pub async fn extract(
        &self,
        object: &ObjectRef,
    ) -> Result<Option<StructuredRecord>, ExtractionError> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.run(object)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Transient(format!(
                "extraction timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        let m = metrics();
        m.extraction_latency_ms.observe(start.elapsed().as_millis() as u64);

        match result {
            Ok(record) => {
                m.extractions_succeeded.inc();
                debug!(object = %object, extracted = record.is_some(), "Extraction complete");
                Ok(record)
            }
            Err(e) => {
                m.extractions_failed.inc();
                warn!(object = %object, kind = e.kind(), error = %e, "Extraction failed");
                self.reporter
                    .report(FailureReport::ExtractionFailed {
                        bucket: object.bucket.clone(),
                        key: object.key.clone(),
                        kind: e.kind().to_string(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn run(&self, object: &ObjectRef) -> Result<Option<StructuredRecord>, ExtractionError> {
        let path = Path::parse(&object.key)
            .map_err(|e| ExtractionError::Parse(format!("invalid object key: {}", e)))?;

        let body = self
            .intake
            .get(&path)
            .await
            .map_err(|e| match e {
                object_store::Error::NotFound { path, .. } => ExtractionError::NotFound(path),
                other => ExtractionError::Store(other.to_string()),
            })?
            .bytes()
            .await
            .map_err(|e| ExtractionError::Store(e.to_string()))?;

        let Some(record) = StructuredRecord::parse_file(&body)
            .map_err(|e| ExtractionError::Parse(e.to_string()))?
        else {
            return Ok(None);
        };

        self.records.put(&record).await.map_err(|e| {
            if e.is_transient() {
                ExtractionError::Transient(e.to_string())
            } else {
                ExtractionError::Store(e.to_string())
            }
        })?;

        Ok(Some(record))
    }
}
