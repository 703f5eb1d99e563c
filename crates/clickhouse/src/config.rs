//! ClickHouse configuration.

use serde::{Deserialize, Serialize};

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Server-side query timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Table receiving bulk loads of sealed batches
    #[serde(default = "default_events_table")]
    pub events_table: String,
    /// Table backing the structured record store
    #[serde(default = "default_records_table")]
    pub records_table: String,
}

fn default_database() -> String {
    "canvastream".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_events_table() -> String {
    "recording_events".to_string()
}

fn default_records_table() -> String {
    "recordings".to_string()
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: default_database(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            events_table: default_events_table(),
            records_table: default_records_table(),
        }
    }
}

impl ClickHouseConfig {
    /// Fully qualified bulk load table.
    pub fn events_table_name(&self) -> String {
        format!("{}.{}", self.database, self.events_table)
    }

    /// Fully qualified record store table.
    pub fn records_table_name(&self) -> String {
        format!("{}.{}", self.database, self.records_table)
    }
}
