//! Admission backpressure.
//!
//! Counts records admitted but not yet delivered or backed up, and sealed
//! batches the dispatcher has not settled. Intake reserves against these
//! bounds before forwarding a record; the dispatcher releases on settle.

use std::sync::atomic::{AtomicUsize, Ordering};
use stream_core::{Error, PipelineConfig, Result};
use telemetry::metrics;

#[derive(Debug)]
pub struct Backlog {
    pending_records: AtomicUsize,
    outstanding_batches: AtomicUsize,
    capacity_bound: usize,
    max_outstanding_batches: usize,
}

impl Backlog {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_bounds(config.capacity_bound, config.max_outstanding_batches)
    }

    pub fn with_bounds(capacity_bound: usize, max_outstanding_batches: usize) -> Self {
        Self {
            pending_records: AtomicUsize::new(0),
            outstanding_batches: AtomicUsize::new(0),
            capacity_bound,
            max_outstanding_batches,
        }
    }

    pub fn pending_records(&self) -> usize {
        self.pending_records.load(Ordering::Acquire)
    }

    pub fn outstanding_batches(&self) -> usize {
        self.outstanding_batches.load(Ordering::Acquire)
    }

    /// Reserve room for one record, or fail with a capacity error.
    pub fn try_reserve_record(&self) -> Result<()> {
        let outstanding = self.outstanding_batches();
        if outstanding >= self.max_outstanding_batches {
            return Err(Error::capacity(format!(
                "{} batches awaiting delivery, limit is {}",
                outstanding, self.max_outstanding_batches
            )));
        }

        let bound = self.capacity_bound;
        self.pending_records
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                (pending < bound).then_some(pending + 1)
            })
            .map_err(|pending| {
                Error::capacity(format!(
                    "{} records awaiting delivery, limit is {}",
                    pending, bound
                ))
            })?;

        metrics().pending_records.set(self.pending_records() as u64);
        Ok(())
    }

    /// Give back a reservation for a record that was never forwarded.
    pub fn release_record(&self) {
        self.release_records(1);
    }

    /// A stream sealed a batch and handed it to the dispatcher.
    pub fn batch_sealed(&self) {
        let outstanding = self.outstanding_batches.fetch_add(1, Ordering::AcqRel) + 1;
        metrics().outstanding_batches.set(outstanding as u64);
    }

    /// The dispatcher delivered, backed up, or gave up on a batch.
    pub fn batch_settled(&self, records: usize) {
        let outstanding = self
            .outstanding_batches
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0)
            .saturating_sub(1);
        metrics().outstanding_batches.set(outstanding as u64);
        self.release_records(records);
    }

    fn release_records(&self, records: usize) {
        let _ = self
            .pending_records
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(records))
            });
        metrics().pending_records.set(self.pending_records() as u64);
    }
}
