//! Object storage connection
//!
//! Builds the storage client for one export and opens the streaming upload
//! the sinks write into. The client carries the resolved credentials, the
//! retry bound, the region and the object-level ACL / SSE-KMS settings.
//!
//! [`StoreConnector`] is the seam between the sinks and the storage backend:
//! [`S3StoreConnector`] talks to S3, tests plug in an in-memory store.

use crate::config::{MAX_RETRIES, SSE_KMS, UPLOAD_CONCURRENCY, UPLOAD_PART_SIZE};
use crate::credentials::CredentialSource;
use crate::destination::Destination;
use crate::error::{Error, Result};
use object_store::aws::{AmazonS3Builder, AwsCredentialProvider};
use object_store::buffered::BufWriter;
use object_store::{ClientOptions, ObjectStore, RetryConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use tracing::debug;

/// Canned ACLs accepted for written objects
pub const CANNED_ACLS: &[&str] = &[
    "private",
    "public-read",
    "public-read-write",
    "authenticated-read",
    "aws-exec-read",
    "bucket-owner-read",
    "bucket-owner-full-control",
    "log-delivery-write",
];

const ACL_HEADER: &str = "x-amz-acl";

/// Everything needed to build the storage client for one export
#[derive(Debug, Clone)]
pub struct StoreRequest<'a> {
    /// Where the object goes
    pub destination: &'a Destination,
    /// Region override; `None` leaves the client's ambient region
    pub region: Option<&'a str>,
    /// Resolved credentials
    pub credentials: &'a CredentialSource,
    /// Canned ACL for the object
    pub acl: Option<&'a str>,
    /// KMS key id for server-side encryption
    pub sse_kms_key_id: Option<&'a str>,
    /// Custom endpoint (S3-compatible stores)
    pub endpoint: Option<&'a str>,
    /// Allow plain HTTP to the endpoint
    pub allow_http: bool,
}

/// Builds an object store for an export destination
pub trait StoreConnector: Send + Sync + std::fmt::Debug {
    /// Build a store whose root is the destination bucket
    fn connect(&self, request: &StoreRequest<'_>) -> Result<Arc<dyn ObjectStore>>;
}

/// [`StoreConnector`] for Amazon S3 and S3-compatible stores
#[derive(Debug, Clone, Copy, Default)]
pub struct S3StoreConnector;

impl StoreConnector for S3StoreConnector {
    fn connect(&self, request: &StoreRequest<'_>) -> Result<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(request.destination.bucket())
            .with_retry(retry_config());

        if let Some(region) = request.region {
            builder = builder.with_region(region);
        }

        if let CredentialSource::AssumedRole(provider) = request.credentials {
            let provider: AwsCredentialProvider = provider.clone();
            builder = builder.with_credentials(provider);
        }

        if let Some(acl) = request.acl.filter(|acl| !acl.is_empty()) {
            builder = builder.with_client_options(
                ClientOptions::new().with_default_headers(acl_headers(acl)?),
            );
        }

        if let Some(key_id) = request.sse_kms_key_id.filter(|key| !key.is_empty()) {
            builder = builder.with_sse_kms_encryption(key_id);
        }

        if let Some(endpoint) = request.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
        }
        if request.allow_http {
            builder = builder.with_allow_http(true);
        }

        debug!(
            bucket = request.destination.bucket(),
            region = ?request.region,
            acl = ?request.acl,
            sse = request.sse_kms_key_id.map(|_| SSE_KMS),
            assumed_role = request.credentials.is_assumed_role(),
            "Building S3 client"
        );

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;
        Ok(Arc::new(store))
    }
}

/// Retry policy of the storage client, bounded at [`MAX_RETRIES`]
pub fn retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: MAX_RETRIES,
        ..RetryConfig::default()
    }
}

/// Validate a canned ACL and turn it into request headers
pub fn acl_headers(acl: &str) -> Result<HeaderMap> {
    if !CANNED_ACLS.contains(&acl) {
        return Err(Error::invalid_value(
            "acl",
            format!("'{acl}' is not a canned ACL"),
        ));
    }
    let value = HeaderValue::from_str(acl)
        .map_err(|e| Error::invalid_value("acl", e.to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(ACL_HEADER), value);
    Ok(headers)
}

/// Open the streaming multipart upload for a destination
pub fn open_upload(store: Arc<dyn ObjectStore>, destination: &Destination) -> BufWriter {
    BufWriter::with_capacity(store, destination.object_path(), UPLOAD_PART_SIZE)
        .with_max_concurrency(UPLOAD_CONCURRENCY)
}
