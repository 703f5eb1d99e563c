//! Object store configuration.

use serde::{Deserialize, Serialize};

/// Which object store implementation backs a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on restart
    #[default]
    Memory,
    /// Directory on the local filesystem
    Local,
    /// S3 or an S3-compatible endpoint
    S3,
}

/// Object store settings for one bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Bucket name; also the name notifications refer to
    pub bucket: String,

    /// Key prefix for objects written by the pipeline
    #[serde(default)]
    pub prefix: String,

    /// Root directory (local backend)
    #[serde(default)]
    pub root: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub allow_http: bool,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,
}

impl ObjectStoreConfig {
    /// In-memory bucket.
    pub fn memory(bucket: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Memory,
            bucket: bucket.into(),
            prefix: String::new(),
            root: None,
            region: None,
            endpoint: None,
            allow_http: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Default backup bucket.
    pub fn backup_default() -> Self {
        Self::memory("canvastream-backup").with_prefix("backup")
    }

    /// Default intake bucket.
    pub fn intake_default() -> Self {
        Self::memory("canvastream-intake")
    }
}
