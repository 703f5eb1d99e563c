//! Object store factory.
//!
//! Builds an `ObjectStore` for a bucket from its configuration.

use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::info;

use crate::config::{ObjectStoreConfig, StoreBackend};
use crate::error::StorageError;

/// Create the object store described by `config`.
pub fn build_object_store(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    if config.bucket.trim().is_empty() {
        return Err(StorageError::Configuration("bucket name is required".into()));
    }

    let store: Arc<dyn ObjectStore> = match config.backend {
        StoreBackend::Memory => Arc::new(InMemory::new()),
        StoreBackend::Local => create_local_store(config)?,
        StoreBackend::S3 => create_s3_store(config)?,
    };

    info!(
        bucket = %config.bucket,
        backend = ?config.backend,
        "Object store ready"
    );

    Ok(store)
}

fn create_local_store(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    let root = config.root.as_deref().ok_or_else(|| {
        StorageError::Configuration(format!(
            "bucket {} uses the local backend but has no root directory",
            config.bucket
        ))
    })?;

    let path = std::path::Path::new(root).join(&config.bucket);
    std::fs::create_dir_all(&path).map_err(|e| StorageError::Creation {
        store_type: "LocalFileSystem",
        source: object_store::Error::Generic {
            store: "LocalFileSystem",
            source: Box::new(e),
        },
    })?;

    let store = LocalFileSystem::new_with_prefix(path).map_err(|e| StorageError::Creation {
        store_type: "LocalFileSystem",
        source: e,
    })?;

    Ok(Arc::new(store))
}

fn create_s3_store(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    // Backups are written create-only, which S3 honours via If-None-Match
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(&config.bucket)
        .with_conditional_put(S3ConditionalPut::ETagMatch);

    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }

    if let Some(endpoint) = &config.endpoint {
        url::Url::parse(endpoint).map_err(|e| {
            StorageError::Configuration(format!("invalid endpoint {}: {}", endpoint, e))
        })?;
        builder = builder.with_endpoint(endpoint);
    }

    if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
        builder = builder
            .with_access_key_id(key_id)
            .with_secret_access_key(secret);
    }

    let store = builder
        .with_allow_http(config.allow_http)
        .build()
        .map_err(|e| StorageError::Creation {
            store_type: "AWS S3",
            source: e,
        })?;

    Ok(Arc::new(store))
}
