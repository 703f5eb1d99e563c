//! Mock implementations for testing.

use async_trait::async_trait;
use clickhouse_client::{AnalyticalStore, DeliveryError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use stream_core::{LoadPayload, LoadRow};

/// Mock analytical store that captures loads in memory.
///
/// Implements the same `AnalyticalStore` trait as the ClickHouse store.
/// Outcomes are scripted per attempt; once the script runs out every load
/// gets the fallback outcome.
#[derive(Clone)]
pub struct MockAnalyticalStore {
    /// Payloads of successful loads, in load order.
    loads: Arc<Mutex<Vec<LoadPayload>>>,
    script: Arc<Mutex<VecDeque<Result<(), DeliveryError>>>>,
    fallback: Arc<Mutex<Result<(), DeliveryError>>>,
    attempts: Arc<Mutex<usize>>,
    healthy: Arc<Mutex<bool>>,
}

impl MockAnalyticalStore {
    pub fn new() -> Self {
        Self {
            loads: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(Ok(()))),
            attempts: Arc::new(Mutex::new(0)),
            healthy: Arc::new(Mutex::new(true)),
        }
    }

    /// Fail the next `n` attempts transiently.
    pub fn fail_transient(&self, n: usize) {
        let mut script = self.script.lock();
        for _ in 0..n {
            script.push_back(Err(DeliveryError::Transient("mock throttling".into())));
        }
    }

    /// Fail the next attempt permanently.
    pub fn fail_permanent(&self) {
        self.script
            .lock()
            .push_back(Err(DeliveryError::Permanent("mock schema mismatch".into())));
    }

    /// Outcome of every attempt after the script runs out.
    pub fn set_fallback(&self, outcome: Result<(), DeliveryError>) {
        *self.fallback.lock() = outcome;
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock() = healthy;
    }

    pub fn loads(&self) -> Vec<LoadPayload> {
        self.loads.lock().clone()
    }

    /// Every row loaded so far, in load order.
    pub fn loaded_rows(&self) -> Vec<LoadRow> {
        self.loads
            .lock()
            .iter()
            .flat_map(|p| p.decode_rows().unwrap_or_default())
            .collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl Default for MockAnalyticalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalyticalStore for MockAnalyticalStore {
    async fn load(&self, payload: &LoadPayload) -> Result<(), DeliveryError> {
        *self.attempts.lock() += 1;

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().clone());

        if outcome.is_ok() {
            self.loads.lock().push(payload.clone());
        }
        outcome
    }

    async fn ping(&self) -> Result<(), DeliveryError> {
        if *self.healthy.lock() {
            Ok(())
        } else {
            Err(DeliveryError::Transient("mock store down".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> LoadPayload {
        LoadPayload {
            stream: "s-0".into(),
            batch_sequence: 0,
            body: "{\"id\":\"r1\",\"timestamp\":\"1\",\"coordinate_x\":1.0,\"coordinate_y\":2.0,\"is_drawing\":true}\n".into(),
            rows: 1,
        }
    }

    #[tokio::test]
    async fn test_mock_store_follows_script() {
        let mock = MockAnalyticalStore::new();
        mock.fail_transient(1);

        assert!(mock.load(&payload()).await.is_err());
        assert!(mock.load(&payload()).await.is_ok());
        assert_eq!(mock.attempts(), 2);
        assert_eq!(mock.loads().len(), 1);
        assert_eq!(mock.loaded_rows()[0].id, "r1");
    }
}
