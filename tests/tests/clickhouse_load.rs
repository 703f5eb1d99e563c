//! ClickHouse adapter tests.
//!
//! Requires Docker to be running for testcontainers, or
//! `CANVASTREAM_TEST_CLICKHOUSE_URL` pointing at a server. Run with
//! `cargo test -p integration-tests --test clickhouse_load -- --ignored`.

use chrono::Utc;
use clickhouse_client::schema::init_schema;
use clickhouse_client::{
    count_recording_events, query_recording_events, truncate_events, AnalyticalStore,
    ClickHouseAnalyticalStore, ClickHouseClient, ClickHouseRecordStore,
};
use integration_tests::containers::ClickHouseServer;
use storage::{RecordStore, TimestampRange};
use stream_core::{
    AdmittedRecord, BatchMetadata, EventRecord, LoadPayload, SealTrigger, SealedBatch,
    StructuredRecord,
};

fn batch(recording_id: &str, timestamps: &[u64]) -> SealedBatch {
    let records: Vec<AdmittedRecord> = timestamps
        .iter()
        .enumerate()
        .map(|(i, ts)| {
            AdmittedRecord::new(
                i as u64 + 1,
                EventRecord {
                    recording_id: recording_id.to_string(),
                    timestamp: ts.to_string(),
                    coordinate_x: *ts as f64,
                    coordinate_y: 2.5,
                    is_drawing: true,
                },
            )
        })
        .collect();

    let now = Utc::now();
    SealedBatch {
        metadata: BatchMetadata {
            stream: "canvastream-0".to_string(),
            epoch: 1,
            sequence: 0,
            opened_at: now,
            sealed_at: now,
            size_bytes: records.iter().map(|r| r.size_bytes).sum(),
            record_count: records.len(),
            trigger: SealTrigger::Interval,
        },
        records,
    }
}

async fn client(server: &ClickHouseServer) -> ClickHouseClient {
    let client = ClickHouseClient::new(server.config.clone()).expect("Failed to create client");
    init_schema(&client).await.expect("Failed to init schema");
    truncate_events(&client).await.ok();
    client
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_bulk_load_round_trip() {
    let server = ClickHouseServer::start().await;
    let client = client(&server).await;
    let store = ClickHouseAnalyticalStore::new(client.clone());

    store.ping().await.expect("ClickHouse should be reachable");

    let payload = LoadPayload::from_batch(&batch("r-load", &[3, 1, 2])).unwrap();
    store.load(&payload).await.expect("Load failed");

    let count = count_recording_events(&client, "r-load").await.unwrap();
    assert_eq!(count, 3);

    let rows = query_recording_events(&client, "r-load", 10).await.unwrap();
    let timestamps: Vec<_> = rows.iter().map(|r| r.timestamp.as_str()).collect();
    assert_eq!(timestamps, vec!["1", "2", "3"]);
    assert_eq!(rows[0].coordinate_y, 2.5);
    assert!(rows[0].is_drawing);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_record_store_overwrites_same_key() {
    let server = ClickHouseServer::start().await;
    let client = client(&server).await;
    let store = ClickHouseRecordStore::new(client);

    store.ping().await.expect("ClickHouse should be reachable");

    let record = StructuredRecord {
        id: "r-idem".to_string(),
        timestamp: "100".to_string(),
        coordinate_x: 1.0,
        coordinate_y: 2.0,
        is_drawing: false,
    };
    store.put(&record).await.unwrap();
    store.put(&record).await.unwrap();

    let stored = store.query("r-idem", &TimestampRange::all()).await.unwrap();
    assert_eq!(stored, vec![record.clone()]);

    let fetched = store.get("r-idem", "100").await.unwrap();
    assert_eq!(fetched, Some(record));
    assert_eq!(store.get("r-idem", "101").await.unwrap(), None);
}
