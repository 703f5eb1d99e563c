//! Internal metrics collection.
//!
//! Collects metrics in-memory; a background worker logs periodic snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Intake metrics
    pub records_admitted: Counter,
    pub records_rejected_validation: Counter,
    pub records_rejected_capacity: Counter,
    pub credentials_issued: Counter,
    pub rate_limited_requests: Counter,

    // Buffering metrics
    pub batches_sealed_interval: Counter,
    pub batches_sealed_size: Counter,
    pub batches_sealed_flush: Counter,

    // Delivery metrics
    pub delivery_attempts: Counter,
    pub delivery_transient_failures: Counter,
    pub delivery_permanent_failures: Counter,
    pub batches_delivered: Counter,
    pub records_delivered: Counter,

    // Backup metrics
    pub batches_backed_up: Counter,
    pub records_backed_up: Counter,
    pub backup_failures: Counter,

    // Extraction metrics
    pub notifications_received: Counter,
    pub notifications_dropped: Counter,
    pub extractions_succeeded: Counter,
    pub extractions_failed: Counter,

    // Latency histograms
    pub admit_latency_ms: Histogram,
    pub delivery_latency_ms: Histogram,
    pub extraction_latency_ms: Histogram,

    // Gauges
    pub pending_records: Gauge,
    pub outstanding_batches: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub records_admitted: u64,
    pub records_rejected_validation: u64,
    pub records_rejected_capacity: u64,
    pub batches_sealed_interval: u64,
    pub batches_sealed_size: u64,
    pub batches_sealed_flush: u64,
    pub delivery_attempts: u64,
    pub batches_delivered: u64,
    pub records_delivered: u64,
    pub batches_backed_up: u64,
    pub backup_failures: u64,
    pub extractions_succeeded: u64,
    pub extractions_failed: u64,
    pub notifications_dropped: u64,
    pub delivery_latency_mean_ms: f64,
    pub extraction_latency_mean_ms: f64,
    pub pending_records: u64,
    pub outstanding_batches: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            records_admitted: self.records_admitted.get(),
            records_rejected_validation: self.records_rejected_validation.get(),
            records_rejected_capacity: self.records_rejected_capacity.get(),
            batches_sealed_interval: self.batches_sealed_interval.get(),
            batches_sealed_size: self.batches_sealed_size.get(),
            batches_sealed_flush: self.batches_sealed_flush.get(),
            delivery_attempts: self.delivery_attempts.get(),
            batches_delivered: self.batches_delivered.get(),
            records_delivered: self.records_delivered.get(),
            batches_backed_up: self.batches_backed_up.get(),
            backup_failures: self.backup_failures.get(),
            extractions_succeeded: self.extractions_succeeded.get(),
            extractions_failed: self.extractions_failed.get(),
            notifications_dropped: self.notifications_dropped.get(),
            delivery_latency_mean_ms: self.delivery_latency_ms.mean(),
            extraction_latency_mean_ms: self.extraction_latency_ms.mean(),
            pending_records: self.pending_records.get(),
            outstanding_batches: self.outstanding_batches.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
