//! Test doubles shared by the worker's unit tests.

use async_trait::async_trait;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult, Result,
};

/// Object store that reads like `InMemory` but refuses every write.
#[derive(Debug)]
pub(crate) struct RejectingStore {
    inner: InMemory,
}

impl RejectingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemory::new(),
        }
    }
}

impl std::fmt::Display for RejectingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RejectingStore")
    }
}

fn rejected() -> object_store::Error {
    object_store::Error::Generic {
        store: "RejectingStore",
        source: "bucket is read-only".into(),
    }
}

#[async_trait]
impl ObjectStore for RejectingStore {
    async fn put_opts(&self, _: &Path, _: PutPayload, _: PutOptions) -> Result<PutResult> {
        Err(rejected())
    }

    async fn put_multipart_opts(
        &self,
        _: &Path,
        _: PutMultipartOpts,
    ) -> Result<Box<dyn MultipartUpload>> {
        Err(rejected())
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, _: &Path, _: &Path) -> Result<()> {
        Err(rejected())
    }

    async fn copy_if_not_exists(&self, _: &Path, _: &Path) -> Result<()> {
        Err(rejected())
    }
}
