//! Fakes shared by the unit tests

use crate::credentials::{RoleAssumer, TemporaryCredentials};
use crate::error::{Error, Result};
use crate::storage::{self, StoreConnector, StoreRequest};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult,
};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Role assumer returning a canned result and counting calls
#[derive(Debug)]
pub(crate) struct FakeAssumer {
    result: std::result::Result<TemporaryCredentials, String>,
    calls: AtomicUsize,
}

impl FakeAssumer {
    pub(crate) fn ok() -> Self {
        Self::with(Ok(TemporaryCredentials::new(
            "AKIAFAKE",
            "fake-secret",
            Some("fake-token".to_string()),
            None,
        )))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::with(Err(Error::credential(message)))
    }

    pub(crate) fn with(result: Result<TemporaryCredentials>) -> Self {
        Self {
            result: result.map_err(|e| e.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleAssumer for FakeAssumer {
    async fn assume_role(&self, _role_arn: &str, _session_name: &str) -> Result<TemporaryCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(Error::credential)
    }
}

/// What a sink asked the connector for
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub bucket: String,
    pub key: String,
    pub region: Option<String>,
    pub assumed_role: bool,
    pub acl: Option<String>,
    pub sse_kms_key_id: Option<String>,
}

/// Connector handing out one shared store and recording every request
#[derive(Debug)]
pub(crate) struct MemoryConnector {
    store: Arc<dyn ObjectStore>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MemoryConnector {
    pub(crate) fn new() -> Self {
        Self::with_store(Arc::new(InMemory::new()))
    }

    pub(crate) fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every key in the store
    pub(crate) async fn keys(&self) -> Vec<String> {
        self.store
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .unwrap()
    }

    /// Contents of an object, `None` if it was never written
    pub(crate) async fn object(&self, key: &str) -> Option<bytes::Bytes> {
        let location = Path::parse(key).ok()?;
        let result = self.store.get(&location).await.ok()?;
        result.bytes().await.ok()
    }
}

impl StoreConnector for MemoryConnector {
    fn connect(&self, request: &StoreRequest<'_>) -> Result<Arc<dyn ObjectStore>> {
        if let Some(acl) = request.acl {
            storage::acl_headers(acl)?;
        }
        self.requests.lock().unwrap().push(RecordedRequest {
            bucket: request.destination.bucket().to_string(),
            key: request.destination.key().to_string(),
            region: request.region.map(str::to_string),
            assumed_role: request.credentials.is_assumed_role(),
            acl: request.acl.map(str::to_string),
            sse_kms_key_id: request.sse_kms_key_id.map(str::to_string),
        });
        Ok(self.store.clone())
    }
}

/// Store whose uploads never complete
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    inner: InMemory,
}

impl fmt::Display for FailingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailingStore")
    }
}

fn rejected() -> object_store::Error {
    object_store::Error::Generic {
        store: "FailingStore",
        source: "upload rejected".into(),
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put_opts(
        &self,
        _location: &Path,
        _payload: PutPayload,
        _opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        Err(rejected())
    }

    async fn put_multipart_opts(
        &self,
        _location: &Path,
        _opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        Err(rejected())
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}
