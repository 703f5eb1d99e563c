//! ClickHouse table schemas.
//!
//! - `recording_events`: append-only target of bulk loads; duplicates from
//!   redelivery are tolerated
//! - `recordings`: the structured record store, a ReplacingMergeTree keyed
//!   by `(id, timestamp)` so a replayed put collapses onto one row

use crate::client::ClickHouseClient;
use crate::config::ClickHouseConfig;
use stream_core::{Error, Result};
use tracing::debug;

/// SQL for creating the database.
pub fn create_database(config: &ClickHouseConfig) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", config.database)
}

/// SQL for creating the bulk load table.
///
/// Column order matches the load payload's key order.
pub fn create_events_table(config: &ClickHouseConfig) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {} (
    id String,
    timestamp String,
    coordinate_x Float64,
    coordinate_y Float64,
    is_drawing Bool,

    -- Metadata
    loaded_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
ORDER BY (id, timestamp)
SETTINGS index_granularity = 8192
"#,
        config.events_table_name()
    )
}

/// SQL for creating the structured record table.
pub fn create_records_table(config: &ClickHouseConfig) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {} (
    id String,
    timestamp String,
    coordinate_x Float64,
    coordinate_y Float64,
    is_drawing Bool,
    updated_at DateTime64(3) DEFAULT now64(3)
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (id, timestamp)
"#,
        config.records_table_name()
    )
}

/// All schema statements, database first.
pub fn all_statements(config: &ClickHouseConfig) -> Vec<String> {
    vec![
        create_database(config),
        create_events_table(config),
        create_records_table(config),
    ]
}

/// Initialize the database schema.
///
/// Creates the database and all tables if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let server = client.server();
    for sql in all_statements(client.config()) {
        server
            .query(&sql)
            .execute()
            .await
            .map_err(|e| Error::internal(format!("Schema init error: {}", e)))?;
    }
    debug!(database = %client.config().database, "ClickHouse schema initialized");
    Ok(())
}
