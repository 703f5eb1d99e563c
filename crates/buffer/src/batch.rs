//! Open batch accumulator for a single stream.
//!
//! `StreamBuffer` is the pure state machine behind a stream actor:
//! Empty → Accumulating → Sealed, after which a fresh batch opens with the
//! next generation. It never reads the clock itself; callers pass `now`.

use chrono::{DateTime, Utc};
use std::time::Duration;
use stream_core::{AdmittedRecord, BatchMetadata, SealTrigger, SealedBatch};
use tokio::time::Instant;

/// Observable state of the open batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    Empty,
    Accumulating,
}

/// Accumulates records for one stream until a seal trigger fires.
#[derive(Debug)]
pub struct StreamBuffer {
    stream: String,
    epoch: u64,
    interval: Duration,
    size_threshold: usize,
    /// Sequence of the currently open batch
    generation: u64,
    records: Vec<AdmittedRecord>,
    size_bytes: usize,
    opened_at: Option<Instant>,
    opened_at_utc: Option<DateTime<Utc>>,
}

impl StreamBuffer {
    pub fn new(stream: impl Into<String>, interval: Duration, size_threshold: usize) -> Self {
        Self {
            stream: stream.into(),
            epoch: 0,
            interval,
            size_threshold,
            generation: 0,
            records: Vec::new(),
            size_bytes: 0,
            opened_at: None,
            opened_at_utc: None,
        }
    }

    /// Tag every batch this buffer seals with the engine run's epoch.
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn state(&self) -> BufferState {
        if self.records.is_empty() {
            BufferState::Empty
        } else {
            BufferState::Accumulating
        }
    }

    /// When the interval trigger fires for the open batch, if it has records.
    pub fn due_at(&self) -> Option<Instant> {
        self.opened_at.map(|opened| opened + self.interval)
    }

    /// Append a record. Returns the sealed batch when the size trigger fires;
    /// the record that crosses the threshold is part of that batch.
    pub fn push(&mut self, record: AdmittedRecord, now: Instant) -> Option<SealedBatch> {
        if self.records.is_empty() {
            self.opened_at = Some(now);
            self.opened_at_utc = Some(Utc::now());
        }

        self.size_bytes += record.size_bytes;
        self.records.push(record);

        if self.size_bytes >= self.size_threshold {
            return self.seal_current(SealTrigger::Size);
        }

        None
    }

    /// Seal the open batch if the interval has elapsed at `now`.
    pub fn poll_interval(&mut self, now: Instant) -> Option<SealedBatch> {
        match self.due_at() {
            Some(due) if now >= due => self.seal_current(SealTrigger::Interval),
            _ => None,
        }
    }

    /// Seal the batch of `generation`.
    ///
    /// No-op when that generation is already sealed or the open batch is
    /// empty, so racing triggers produce exactly one sealed batch.
    pub fn seal(&mut self, generation: u64, trigger: SealTrigger) -> Option<SealedBatch> {
        if generation != self.generation || self.records.is_empty() {
            return None;
        }

        let records = std::mem::take(&mut self.records);
        let size_bytes = std::mem::take(&mut self.size_bytes);
        let opened_at = self.opened_at_utc.take().unwrap_or_else(Utc::now);
        self.opened_at = None;

        let metadata = BatchMetadata {
            stream: self.stream.clone(),
            epoch: self.epoch,
            sequence: self.generation,
            opened_at,
            sealed_at: Utc::now(),
            size_bytes,
            record_count: records.len(),
            trigger,
        };
        self.generation += 1;

        Some(SealedBatch { metadata, records })
    }

    /// Seal whatever is open.
    pub fn seal_current(&mut self, trigger: SealTrigger) -> Option<SealedBatch> {
        self.seal(self.generation, trigger)
    }
}
