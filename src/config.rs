//! Open-time configuration for export sinks
//!
//! A [`SinkConfig`] is built by the caller from the statement's `WITH`
//! parameters (or a YAML file) and handed to `open`. Nothing here reads
//! process-wide state.

use crate::error::{Error, Result};
use crate::types::{OutputFormat, ParamMap};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Field separator used when no delimiter is configured
pub const DEFAULT_DELIMITER: u8 = b'\t';

/// Region used by the Parquet sink when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Upper bound on transient-failure retries inside the storage client
pub const MAX_RETRIES: usize = 10;

/// Number of multipart upload parts in flight per sink
pub const UPLOAD_CONCURRENCY: usize = 16;

/// Size of one multipart upload part
pub const UPLOAD_PART_SIZE: usize = 10 * 1024 * 1024;

/// Target size of a Parquet row group in bytes
pub const ROW_GROUP_SIZE_BYTES: usize = 128 * 1024 * 1024;

/// Rows accumulated before they are handed to the Parquet writer
pub const ROW_BATCH_SIZE: usize = 1024;

/// Server-side encryption mode applied together with a KMS key id
pub const SSE_KMS: &str = "aws:kms";

// ============================================================================
// Sink Config
// ============================================================================

/// Configuration of one export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkConfig {
    /// Output format; only `parquet` selects Parquet
    #[serde(default)]
    pub format: Option<String>,

    /// CSV field separator (a single ASCII character, default tab)
    #[serde(default)]
    pub delimiter: Option<String>,

    /// Role to assume before writing
    #[serde(default)]
    pub assume_role_arn: Option<String>,

    /// Canned ACL applied to the written object
    #[serde(default)]
    pub acl: Option<String>,

    /// KMS key id for server-side encryption
    #[serde(default)]
    pub sse_kms_key_id: Option<String>,

    /// Storage region
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Allow plain HTTP to the endpoint
    #[serde(default)]
    pub allow_http: bool,
}

impl SinkConfig {
    /// Create an empty config (CSV, tab-delimited, ambient credentials)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from statement parameters.
    ///
    /// Parameter names match the `WITH` options of the export statement
    /// (`format`, `delimiter`, `assumeRoleArn`, `acl`, `sseKmsKeyId`, `region`,
    /// `endpoint`, `allowHttp`).
    pub fn from_params(params: &ParamMap) -> Result<Self> {
        let mut config = Self::default();
        for (key, value) in params {
            match key.as_str() {
                "format" => config.format = Some(value.clone()),
                "delimiter" => config.delimiter = Some(value.clone()),
                "assumeRoleArn" => config.assume_role_arn = Some(value.clone()),
                "acl" => config.acl = Some(value.clone()),
                "sseKmsKeyId" => config.sse_kms_key_id = Some(value.clone()),
                "region" => config.region = Some(value.clone()),
                "endpoint" => config.endpoint = Some(value.clone()),
                "allowHttp" => {
                    config.allow_http = value.parse().map_err(|_| {
                        Error::invalid_value("allowHttp", format!("expected bool, got '{value}'"))
                    })?;
                }
                other => debug!(param = other, "Ignoring unknown sink parameter"),
            }
        }
        Ok(config)
    }

    /// Parse a config from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the CSV delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the role to assume
    #[must_use]
    pub fn with_assume_role_arn(mut self, arn: impl Into<String>) -> Self {
        self.assume_role_arn = Some(arn.into());
        self
    }

    /// Set the canned ACL
    #[must_use]
    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    /// Set the SSE-KMS key id
    #[must_use]
    pub fn with_sse_kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.sse_kms_key_id = Some(key_id.into());
        self
    }

    /// Set the region
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>, allow_http: bool) -> Self {
        self.endpoint = Some(endpoint.into());
        self.allow_http = allow_http;
        self
    }

    /// Resolved output format
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_param(self.format.as_deref())
    }

    /// Resolved CSV delimiter byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        let Some(delimiter) = self.delimiter.as_deref() else {
            return Ok(DEFAULT_DELIMITER);
        };
        match delimiter.chars().next() {
            Some(c) if c.is_ascii() => Ok(c as u8),
            Some(c) => Err(Error::invalid_value(
                "delimiter",
                format!("'{c}' is not a single-byte character"),
            )),
            None => Err(Error::invalid_value("delimiter", "must not be empty")),
        }
    }

    /// Role ARN, if one is configured and non-empty
    pub fn role_arn(&self) -> Option<&str> {
        self.assume_role_arn.as_deref().filter(|s| !s.is_empty())
    }

    /// Region for the Parquet sink (configured or [`DEFAULT_REGION`])
    pub fn region_or_default(&self) -> &str {
        self.region
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SinkConfig::new();
        assert_eq!(config.output_format(), OutputFormat::Csv);
        assert_eq!(config.delimiter_byte().unwrap(), b'\t');
        assert_eq!(config.role_arn(), None);
        assert_eq!(config.region_or_default(), "us-east-1");
    }

    #[test]
    fn test_from_params() {
        let params: ParamMap = [
            ("format", "parquet"),
            ("delimiter", ","),
            ("assumeRoleArn", "arn:aws:iam::123456789012:role/export"),
            ("acl", "bucket-owner-full-control"),
            ("sseKmsKeyId", "kms-key"),
            ("region", "eu-west-1"),
            ("somethingElse", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = SinkConfig::from_params(&params).unwrap();
        assert_eq!(config.output_format(), OutputFormat::Parquet);
        assert_eq!(config.delimiter_byte().unwrap(), b',');
        assert_eq!(
            config.role_arn(),
            Some("arn:aws:iam::123456789012:role/export")
        );
        assert_eq!(config.acl.as_deref(), Some("bucket-owner-full-control"));
        assert_eq!(config.sse_kms_key_id.as_deref(), Some("kms-key"));
        assert_eq!(config.region_or_default(), "eu-west-1");
    }

    #[test]
    fn test_from_params_bad_bool() {
        let params: ParamMap = [("allowHttp".to_string(), "maybe".to_string())]
            .into_iter()
            .collect();
        assert!(SinkConfig::from_params(&params).is_err());
    }

    #[test]
    fn test_delimiter_first_char() {
        let config = SinkConfig::new().with_delimiter("|;");
        assert_eq!(config.delimiter_byte().unwrap(), b'|');
    }

    #[test]
    fn test_delimiter_invalid() {
        assert!(SinkConfig::new().with_delimiter("").delimiter_byte().is_err());
        assert!(SinkConfig::new().with_delimiter("§").delimiter_byte().is_err());
    }

    #[test]
    fn test_empty_role_arn_is_none() {
        let config = SinkConfig::new().with_assume_role_arn("");
        assert_eq!(config.role_arn(), None);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r"
format: parquet
assumeRoleArn: arn:aws:iam::1:role/r
sseKmsKeyId: key-1
endpoint: http://localhost:9000
allowHttp: true
";
        let config = SinkConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.output_format(), OutputFormat::Parquet);
        assert_eq!(config.role_arn(), Some("arn:aws:iam::1:role/r"));
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.allow_http);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.yaml");
        std::fs::write(&path, "delimiter: \",\"\n").unwrap();
        let config = SinkConfig::from_file(&path).unwrap();
        assert_eq!(config.delimiter_byte().unwrap(), b',');

        assert!(SinkConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
