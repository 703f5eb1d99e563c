//! ClickHouse server for the adapter tests.
//!
//! Only the ClickHouse tests need Docker; everything else runs against
//! in-memory stores. Set `CANVASTREAM_TEST_CLICKHOUSE_URL` to reuse a
//! running server instead of starting a container.

use clickhouse_client::ClickHouseConfig;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

const IMAGE: &str = "clickhouse/clickhouse-server";
const TAG: &str = "24.3";
const DATABASE: &str = "canvastream";
const HTTP_PORT: u16 = 8123;

/// A reachable ClickHouse server; the container, if any, stops on drop.
pub struct ClickHouseServer {
    _container: Option<ContainerAsync<GenericImage>>,
    pub config: ClickHouseConfig,
}

impl ClickHouseServer {
    pub async fn start() -> Self {
        match external_config() {
            Some(config) => Self {
                _container: None,
                config,
            },
            None => {
                let (container, url) = start_container().await;
                Self {
                    _container: Some(container),
                    config: ClickHouseConfig {
                        url,
                        database: DATABASE.to_string(),
                        username: Some("default".to_string()),
                        password: None,
                        ..Default::default()
                    },
                }
            }
        }
    }
}

fn external_config() -> Option<ClickHouseConfig> {
    let url = std::env::var("CANVASTREAM_TEST_CLICKHOUSE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())?;

    Some(ClickHouseConfig {
        url,
        database: std::env::var("CANVASTREAM_TEST_CLICKHOUSE_DB")
            .unwrap_or_else(|_| DATABASE.to_string()),
        username: std::env::var("CANVASTREAM_TEST_CLICKHOUSE_USER").ok(),
        password: std::env::var("CANVASTREAM_TEST_CLICKHOUSE_PASSWORD").ok(),
        ..Default::default()
    })
}

async fn start_container() -> (ContainerAsync<GenericImage>, String) {
    // Passwordless default user needs access management enabled
    let container = GenericImage::new(IMAGE, TAG)
        .with_wait_for(WaitFor::seconds(5))
        .with_exposed_port(HTTP_PORT.tcp())
        .with_env_var("CLICKHOUSE_DB", DATABASE)
        .with_env_var("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1")
        .with_env_var("CLICKHOUSE_USER", "default")
        .with_env_var("CLICKHOUSE_PASSWORD", "")
        .start()
        .await
        .expect("Failed to start ClickHouse");

    let port = container
        .get_host_port_ipv4(HTTP_PORT)
        .await
        .expect("ClickHouse HTTP port not mapped");
    let url = format!("http://127.0.0.1:{}", port);

    wait_until_serving(&url, Duration::from_secs(30)).await;
    (container, url)
}

/// Poll the HTTP interface until it answers 200.
async fn wait_until_serving(url: &str, timeout: Duration) {
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        let ready = client
            .get(url)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false);
        if ready {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("ClickHouse at {} not ready after {:?}", url, timeout);
}
