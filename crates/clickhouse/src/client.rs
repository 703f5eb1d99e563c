//! Shared ClickHouse handle.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use stream_core::{Error, Result};
use tracing::info;

/// Configured ClickHouse HTTP client plus the settings it was built from.
///
/// Cloning is cheap; the underlying HTTP connection pool is shared.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::internal("ClickHouse URL is required"));
        }

        let inner = credentials(
            Client::default()
                .with_url(&config.url)
                .with_option("max_execution_time", config.timeout_secs.to_string()),
            &config,
        );

        info!(
            url = %config.url,
            database = %config.database,
            events_table = %config.events_table_name(),
            "ClickHouse client ready"
        );

        Ok(Self {
            inner: inner.with_database(&config.database),
            config,
        })
    }

    /// Client bound to the configured database.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Client bound to the server's `default` database, for DDL that must
    /// run before the configured database exists.
    pub fn server(&self) -> Client {
        self.inner.clone().with_database("default")
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}

fn credentials(client: Client, config: &ClickHouseConfig) -> Client {
    let client = match config.username.as_deref() {
        Some(user) => client.with_user(user),
        None => client,
    };
    match config.password.as_deref() {
        Some(password) => client.with_password(password),
        None => client,
    }
}
