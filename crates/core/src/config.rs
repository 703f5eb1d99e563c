//! Pipeline configuration.
//!
//! Injected into each component at construction; nothing reads it from
//! process-wide state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffering, delivery and admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Max wait before a forced seal
    #[serde(default = "default_buffer_interval_seconds")]
    pub buffer_interval_seconds: u64,
    /// Max accumulated size before a forced seal
    #[serde(default = "default_buffer_size_threshold_bytes")]
    pub buffer_size_threshold_bytes: usize,
    /// Delivery attempts per batch before escalating to backup
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Base of the exponential backoff between attempts
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Max records admitted but not yet delivered or backed up
    #[serde(default = "default_capacity_bound")]
    pub capacity_bound: usize,
    /// Max sealed batches waiting on the dispatcher
    #[serde(default = "default_max_outstanding_batches")]
    pub max_outstanding_batches: usize,
    /// Timeout of a single delivery attempt
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    /// Timeout of a single extraction attempt
    #[serde(default = "default_extraction_timeout_ms")]
    pub extraction_timeout_ms: u64,
    /// Number of logical streams records are sharded across
    #[serde(default = "default_stream_shards")]
    pub stream_shards: usize,
    /// Base name of the streams (also the backup key prefix)
    #[serde(default = "default_stream_name")]
    pub stream_name: String,
    /// Bounded command queue per stream
    #[serde(default = "default_stream_channel_capacity")]
    pub stream_channel_capacity: usize,
}

fn default_buffer_interval_seconds() -> u64 {
    60
}

fn default_buffer_size_threshold_bytes() -> usize {
    1024 * 1024
}

fn default_retry_budget() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_capacity_bound() -> usize {
    100_000
}

fn default_max_outstanding_batches() -> usize {
    64
}

fn default_delivery_timeout_ms() -> u64 {
    30_000
}

fn default_extraction_timeout_ms() -> u64 {
    10_000
}

fn default_stream_shards() -> usize {
    4
}

fn default_stream_name() -> String {
    "recording-events".to_string()
}

fn default_stream_channel_capacity() -> usize {
    10_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_interval_seconds: default_buffer_interval_seconds(),
            buffer_size_threshold_bytes: default_buffer_size_threshold_bytes(),
            retry_budget: default_retry_budget(),
            backoff_base_ms: default_backoff_base_ms(),
            capacity_bound: default_capacity_bound(),
            max_outstanding_batches: default_max_outstanding_batches(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            extraction_timeout_ms: default_extraction_timeout_ms(),
            stream_shards: default_stream_shards(),
            stream_name: default_stream_name(),
            stream_channel_capacity: default_stream_channel_capacity(),
        }
    }
}

impl PipelineConfig {
    pub fn buffer_interval(&self) -> Duration {
        Duration::from_secs(self.buffer_interval_seconds)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn check(&self) -> crate::Result<()> {
        if self.retry_budget == 0 {
            return Err(crate::Error::internal("retry_budget must be at least 1"));
        }
        if self.stream_shards == 0 {
            return Err(crate::Error::internal("stream_shards must be at least 1"));
        }
        if self.buffer_size_threshold_bytes == 0 {
            return Err(crate::Error::internal(
                "buffer_size_threshold_bytes must be positive",
            ));
        }
        if self.capacity_bound == 0 || self.max_outstanding_batches == 0 {
            return Err(crate::Error::internal("capacity bounds must be positive"));
        }
        if self.stream_channel_capacity == 0 {
            return Err(crate::Error::internal(
                "stream_channel_capacity must be positive",
            ));
        }
        Ok(())
    }
}
