//! Operator failure reporting.
//!
//! Delivery escalations, backup failures and extraction failures never reach
//! producers. They are fanned out here to the log, an optional webhook and
//! in-process subscribers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Failure report types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReport {
    /// A batch could not be delivered and was written to the backup store
    BatchBackedUp {
        stream: String,
        batch_sequence: u64,
        records: usize,
        reason: String,
        backup_key: String,
    },
    /// A batch could not be written to the backup store
    BackupFailed {
        stream: String,
        batch_sequence: u64,
        records: usize,
        error: String,
    },
    /// An uploaded record file could not be extracted
    ExtractionFailed {
        bucket: String,
        key: String,
        kind: String,
        error: String,
    },
    /// System alert
    SystemAlert { message: String, severity: String },
}

impl FailureReport {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BatchBackedUp { .. } => "batch_backed_up",
            Self::BackupFailed { .. } => "backup_failed",
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::SystemAlert { .. } => "system_alert",
        }
    }
}

/// Failure channel.
#[derive(Debug, Clone)]
pub enum FailureChannel {
    /// Log only (default)
    Log,
    /// POST the report as JSON
    Webhook { url: String },
}

/// Fans failure reports out to every configured channel.
pub struct FailureReporter {
    channels: Vec<FailureChannel>,
    http: reqwest::Client,
    subscribers: broadcast::Sender<FailureReport>,
    last_backup_failures: AtomicU64,
}

impl Default for FailureReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureReporter {
    pub fn new() -> Self {
        let (subscribers, _) = broadcast::channel(1024);
        Self {
            channels: vec![FailureChannel::Log],
            http: reqwest::Client::new(),
            subscribers,
            last_backup_failures: AtomicU64::new(0),
        }
    }

    pub fn with_channel(mut self, channel: FailureChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Log channel plus a webhook when one is configured.
    pub fn from_webhook(url: Option<String>) -> Self {
        match url {
            Some(url) if !url.trim().is_empty() => {
                Self::new().with_channel(FailureChannel::Webhook { url })
            }
            _ => Self::new(),
        }
    }

    /// Receive every report sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<FailureReport> {
        self.subscribers.subscribe()
    }

    /// Send a report on every channel. Channel errors are logged, never
    /// returned.
    pub async fn report(&self, report: FailureReport) {
        for channel in &self.channels {
            match channel {
                FailureChannel::Log => match &report {
                    FailureReport::BatchBackedUp { .. } | FailureReport::SystemAlert { .. } => {
                        warn!(kind = report.kind(), report = ?report, "Failure report")
                    }
                    _ => error!(kind = report.kind(), report = ?report, "Failure report"),
                },
                FailureChannel::Webhook { url } => {
                    let sent = self
                        .http
                        .post(url)
                        .json(&report)
                        .send()
                        .await
                        .and_then(|resp| resp.error_for_status());
                    if let Err(e) = sent {
                        error!(url = %url, error = %e, "Failed to deliver failure webhook");
                    }
                }
            }
        }

        // No subscribers is fine.
        let _ = self.subscribers.send(report);
    }

    /// Check metrics and send alerts if backups started failing.
    pub async fn check_and_alert(&self) {
        use telemetry::metrics;

        let snapshot = metrics().snapshot();

        let failures = snapshot.backup_failures;
        let previous = self.last_backup_failures.swap(failures, Ordering::Relaxed);
        if failures > previous {
            self.report(FailureReport::SystemAlert {
                message: format!(
                    "{} batches could not be backed up since the last check",
                    failures - previous
                ),
                severity: "critical".to_string(),
            })
            .await;
        }

        if snapshot.outstanding_batches > 0 {
            info!(
                outstanding_batches = snapshot.outstanding_batches,
                pending_records = snapshot.pending_records,
                "Delivery backlog"
            );
        }
    }
}
