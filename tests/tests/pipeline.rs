//! End-to-end tests for the delivery pipeline.
//!
//! These tests drive intake directly and validate the full data flow:
//! intake → stream actor → dispatcher → MockAnalyticalStore, with undelivered
//! batches landing in the in-memory backup store.

use std::collections::BTreeSet;

use api::CredentialConfig;
use integration_tests::setup::{test_pipeline_config, TestContext};
use stream_core::{EventRecord, PipelineConfig, SealTrigger};

fn record(recording_id: &str, timestamp: u64) -> EventRecord {
    EventRecord {
        recording_id: recording_id.to_string(),
        timestamp: timestamp.to_string(),
        coordinate_x: timestamp as f64,
        coordinate_y: 1.0,
        is_drawing: timestamp % 2 == 0,
    }
}

/// Two records of one recording, forced time seal, first attempt succeeds:
/// one load with rows in arrival order and no backup.
#[tokio::test]
async fn test_forced_seal_delivers_in_arrival_order() {
    let ctx = TestContext::new().await;
    let intake = ctx.pipeline.intake();

    intake.admit(record("r1", 1)).expect("admit A");
    intake.admit(record("r1", 2)).expect("admit B");

    let stream = intake.engine().stream_for("r1").to_string();
    let sealed = intake
        .engine()
        .force_seal(&stream)
        .await
        .expect("force seal");
    assert!(sealed.is_some(), "Open batch should have been sealed");

    ctx.drain().await;

    let loads = ctx.analytical.loads();
    assert_eq!(loads.len(), 1, "Expected exactly one load");
    let rows = loads[0].decode_rows().unwrap();
    let timestamps: Vec<_> = rows.iter().map(|r| r.timestamp.as_str()).collect();
    assert_eq!(timestamps, vec!["1", "2"]);
    assert_eq!(ctx.analytical.attempts(), 1);

    assert!(ctx.backup_references().await.is_empty(), "No backup expected");
}

/// Three transient failures with a retry budget of three: the backup store
/// receives the batch verbatim and the analytical store nothing.
#[tokio::test]
async fn test_retry_exhaustion_backs_up_verbatim() {
    let ctx = TestContext::new().await;
    ctx.analytical.fail_transient(3);
    let intake = ctx.pipeline.intake();

    let a = intake.admit(record("r1", 1)).unwrap();
    let b = intake.admit(record("r1", 2)).unwrap();

    let stream = intake.engine().stream_for("r1").to_string();
    intake.engine().force_seal(&stream).await.unwrap();
    ctx.drain().await;

    assert_eq!(ctx.analytical.attempts(), 3);
    assert!(ctx.analytical.loads().is_empty());

    let batches = ctx.backed_up_batches().await;
    assert_eq!(batches.len(), 1, "Exactly one backup object expected");

    let batch = &batches[0];
    assert_eq!(batch.metadata.stream, stream);
    assert_eq!(batch.metadata.trigger, SealTrigger::Interval);
    let sequences: Vec<_> = batch.records.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![a.sequence, b.sequence]);
    assert_eq!(batch.records[0].record, record("r1", 1));
    assert_eq!(batch.records[1].record, record("r1", 2));
}

/// A permanent failure skips the remaining retries.
#[tokio::test]
async fn test_permanent_failure_backs_up_immediately() {
    let ctx = TestContext::new().await;
    ctx.analytical.fail_permanent();
    let intake = ctx.pipeline.intake();

    intake.admit(record("r2", 1)).unwrap();
    ctx.drain().await;

    assert_eq!(ctx.analytical.attempts(), 1);
    assert_eq!(ctx.backup_references().await.len(), 1);
}

/// Every admitted record is delivered or backed up, whatever the mix of
/// failures.
#[tokio::test]
async fn test_admitted_records_are_delivered_or_backed_up() {
    let ctx = TestContext::new().await;
    ctx.analytical.fail_transient(3);
    ctx.analytical.fail_permanent();
    let intake = ctx.pipeline.intake();

    let mut admitted = BTreeSet::new();
    for round in 0..4u64 {
        for recording in ["a", "b", "c", "d", "e"] {
            let ts = round * 10 + 1;
            intake.admit(record(recording, ts)).unwrap();
            admitted.insert((recording.to_string(), ts.to_string()));
        }
        ctx.drain().await;
    }

    let mut settled: BTreeSet<(String, String)> = ctx
        .analytical
        .loaded_rows()
        .into_iter()
        .map(|r| (r.id, r.timestamp))
        .collect();
    for batch in ctx.backed_up_batches().await {
        for admitted in batch.records {
            settled.insert((admitted.record.recording_id, admitted.record.timestamp));
        }
    }

    assert_eq!(settled, admitted);
    assert_eq!(ctx.pipeline.intake().backlog().pending_records(), 0);
}

/// Shutdown flushes open batches; nothing admitted is lost.
#[tokio::test]
async fn test_shutdown_flushes_open_batches() {
    let ctx = TestContext::new().await;
    let intake = ctx.pipeline.intake();

    for ts in 1..=10 {
        intake.admit(record("r-shutdown", ts)).unwrap();
    }
    ctx.pipeline.shutdown().await;

    let delivered = ctx.analytical.loaded_rows().len();
    let backed_up: usize = ctx
        .backed_up_batches()
        .await
        .iter()
        .map(|b| b.records.len())
        .sum();
    assert_eq!(delivered + backed_up, 10);

    // Intake refuses once the streams are closed
    assert!(intake.admit(record("r-shutdown", 11)).is_err());
}

/// Records beyond the capacity bound are refused with a capacity error
/// until their batch settles.
#[tokio::test]
async fn test_capacity_bound_refuses_admission() {
    let config = PipelineConfig {
        capacity_bound: 3,
        ..test_pipeline_config()
    };
    let ctx = TestContext::with_config(config, CredentialConfig::default()).await;
    let intake = ctx.pipeline.intake();

    for ts in 1..=3 {
        intake.admit(record("r-cap", ts)).unwrap();
    }
    let err = intake.admit(record("r-cap", 4)).unwrap_err();
    assert_eq!(err.error_code(), Some("CAP_001"));
    assert!(err.is_retryable());

    // Capacity frees up once the backlog is delivered
    ctx.drain().await;
    assert!(intake.admit(record("r-cap", 5)).is_ok());
}

/// Records over the size threshold seal on size without waiting for the
/// interval.
#[tokio::test]
async fn test_size_threshold_seals_without_interval() {
    let config = PipelineConfig {
        buffer_size_threshold_bytes: 1024,
        ..test_pipeline_config()
    };
    let ctx = TestContext::with_config(config, CredentialConfig::default()).await;
    let intake = ctx.pipeline.intake();

    for ts in 1..=40 {
        intake.admit(record("r-size", ts)).unwrap();
    }

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while ctx.analytical.loads().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("No size-sealed batch was delivered");

    ctx.drain().await;
    assert_eq!(ctx.analytical.loaded_rows().len(), 40);
}
