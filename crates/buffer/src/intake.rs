//! Record admission.
//!
//! Intake validates a record, reserves backlog capacity, assigns the arrival
//! sequence and forwards the record to its stream. It never waits on
//! delivery: every check is non-blocking.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use stream_core::{AdmittedRecord, Error, EventRecord, Result};
use telemetry::metrics;
use tracing::debug;

use crate::backlog::Backlog;
use crate::engine::BufferEngine;

/// A record accepted by intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub sequence: u64,
    pub stream: String,
}

/// Outcome of admitting a request's records.
#[derive(Debug, Default)]
pub struct AdmitReport {
    pub accepted: Vec<Admission>,
    /// Request index and reason of each rejected record
    pub rejected: Vec<(usize, Error)>,
}

impl AdmitReport {
    pub fn first_sequence(&self) -> Option<u64> {
        self.accepted.first().map(|a| a.sequence)
    }

    /// True when at least one record was refused for capacity.
    pub fn hit_capacity(&self) -> bool {
        self.rejected
            .iter()
            .any(|(_, e)| matches!(e, Error::Capacity { .. }))
    }
}

pub struct Intake {
    engine: Arc<BufferEngine>,
    backlog: Arc<Backlog>,
    /// Next arrival sequence. Held while forwarding so stream queues see
    /// records in sequence order.
    next_sequence: parking_lot::Mutex<u64>,
}

impl Intake {
    pub fn new(engine: Arc<BufferEngine>, backlog: Arc<Backlog>) -> Self {
        Self {
            engine,
            backlog,
            next_sequence: parking_lot::Mutex::new(1),
        }
    }

    pub fn engine(&self) -> &Arc<BufferEngine> {
        &self.engine
    }

    pub fn backlog(&self) -> &Arc<Backlog> {
        &self.backlog
    }

    /// Admit one record.
    pub fn admit(&self, record: EventRecord) -> Result<Admission> {
        let start = Instant::now();
        let m = metrics();

        if let Err(e) = record.check() {
            m.records_rejected_validation.inc();
            return Err(e);
        }

        if let Err(e) = self.backlog.try_reserve_record() {
            m.records_rejected_capacity.inc();
            return Err(e);
        }

        let mut next = self.next_sequence.lock();
        let sequence = *next;
        match self.engine.try_enqueue(AdmittedRecord::new(sequence, record)) {
            Ok(stream) => {
                *next += 1;
                drop(next);

                m.records_admitted.inc();
                m.admit_latency_ms
                    .observe(start.elapsed().as_millis() as u64);
                Ok(Admission {
                    sequence,
                    stream: stream.to_string(),
                })
            }
            Err((e, record)) => {
                drop(next);
                self.backlog.release_record();
                m.records_rejected_capacity.inc();
                debug!(
                    recording_id = %record.record.recording_id,
                    error = %e,
                    "Record refused"
                );
                Err(e)
            }
        }
    }

    /// Admit a request's records in order, collecting per-record rejections.
    pub fn admit_many<I>(&self, records: I) -> AdmitReport
    where
        I: IntoIterator<Item = Result<EventRecord>>,
    {
        let mut report = AdmitReport::default();

        for (index, record) in records.into_iter().enumerate() {
            let outcome = match record {
                Ok(record) => self.admit(record),
                Err(e) => {
                    metrics().records_rejected_validation.inc();
                    Err(e)
                }
            };

            match outcome {
                Ok(admission) => report.accepted.push(admission),
                Err(e) => report.rejected.push((index, e)),
            }
        }

        report
    }
}
