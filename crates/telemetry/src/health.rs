//! Store reachability as last observed by the health probes.
//!
//! Every component starts out unchecked, which counts as unhealthy until the
//! first probe answers.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every store answered
    Healthy,
    /// Some store is down
    Degraded,
    /// No store answered
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Probe {
    Unchecked,
    Up,
    Down(String),
}

#[derive(Debug, Clone)]
struct ProbeState {
    probe: Probe,
    checked_at: Option<DateTime<Utc>>,
}

/// Last probe result of one store.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    state: RwLock<ProbeState>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(ProbeState {
                probe: Probe::Unchecked,
                checked_at: None,
            }),
        }
    }

    pub fn set_healthy(&self) {
        self.record(Probe::Up);
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.record(Probe::Down(msg.into()));
    }

    fn record(&self, probe: Probe) {
        *self.state.write() = ProbeState {
            probe,
            checked_at: Some(Utc::now()),
        };
    }

    pub fn is_healthy(&self) -> bool {
        self.state.read().probe == Probe::Up
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Error from the last failed probe.
    pub fn message(&self) -> Option<String> {
        match &self.state.read().probe {
            Probe::Unchecked => Some("not checked yet".to_string()),
            Probe::Up => None,
            Probe::Down(msg) => Some(msg.clone()),
        }
    }

    pub fn report(&self) -> ComponentHealthReport {
        let state = self.state.read().clone();
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: state.probe == Probe::Up,
            message: self.message(),
            checked_at: state.checked_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// The stores the pipeline depends on.
pub struct HealthRegistry {
    pub analytical_store: ComponentHealth,
    pub backup_store: ComponentHealth,
    pub record_store: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            analytical_store: ComponentHealth::new("analytical_store"),
            backup_store: ComponentHealth::new("backup_store"),
            record_store: ComponentHealth::new("record_store"),
        }
    }

    fn components(&self) -> [&ComponentHealth; 3] {
        [&self.analytical_store, &self.backup_store, &self.record_store]
    }

    pub fn report(&self) -> HealthReport {
        let components: Vec<_> = self.components().iter().map(|c| c.report()).collect();
        let up = components.iter().filter(|c| c.healthy).count();

        let status = match up {
            0 => HealthStatus::Unhealthy,
            n if n == components.len() => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        };

        HealthReport { status, components }
    }

    /// Intake stays open while the analytical store is down as long as
    /// batches can still be backed up.
    pub fn is_ready(&self) -> bool {
        self.analytical_store.is_healthy() || self.backup_store.is_healthy()
    }

    /// The process answers, so it is alive.
    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
