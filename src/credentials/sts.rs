//! Role assumption against the AWS security token service

use super::types::TemporaryCredentials;
use super::RoleAssumer;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::config::Credentials;
use aws_sdk_sts::error::DisplayErrorContext;
use chrono::DateTime;
use std::fmt;

/// [`RoleAssumer`] backed by the AWS SDK STS client.
///
/// The caller's identity comes from the SDK's default chain (environment,
/// profile, instance metadata) unless static base credentials are set.
/// A fresh client is built for every call.
#[derive(Clone, Default)]
pub struct StsRoleAssumer {
    region: Option<String>,
    endpoint: Option<String>,
    duration_seconds: Option<i32>,
    base_credentials: Option<(String, String)>,
}

impl StsRoleAssumer {
    /// Create an assumer using the ambient SDK configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Region of the STS endpoint
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Custom STS endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Requested session duration
    #[must_use]
    pub fn with_duration_seconds(mut self, seconds: i32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Sign the STS call with these long-lived credentials instead of the default chain
    #[must_use]
    pub fn with_static_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.base_credentials = Some((access_key_id.into(), secret_access_key.into()));
        self
    }
}

impl fmt::Debug for StsRoleAssumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsRoleAssumer")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("duration_seconds", &self.duration_seconds)
            .field("base_credentials", &self.base_credentials.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<TemporaryCredentials> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some((access_key_id, secret_access_key)) = &self.base_credentials {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "export-sink",
            ));
        }
        let sdk_config = loader.load().await;
        let client = aws_sdk_sts::Client::new(&sdk_config);

        let output = client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .set_duration_seconds(self.duration_seconds)
            .send()
            .await
            .map_err(|e| {
                Error::credential(format!(
                    "Failed to assume role {role_arn}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let creds = output.credentials().ok_or_else(|| {
            Error::credential(format!("Assuming role {role_arn} returned no credentials"))
        })?;

        Ok(TemporaryCredentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            Some(creds.session_token().to_string()),
            DateTime::from_timestamp(creds.expiration().secs(), 0),
        ))
    }
}
