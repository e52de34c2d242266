//! Caching provider for assumed-role credentials

use super::types::TemporaryCredentials;
use super::RoleAssumer;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use object_store::aws::AwsCredential;
use object_store::CredentialProvider;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Credential provider that assumes a role and caches the result.
///
/// One instance belongs to one sink. Credentials are refreshed through the
/// [`RoleAssumer`] when they are about to expire.
#[derive(Debug)]
pub struct AssumedRoleProvider {
    assumer: Arc<dyn RoleAssumer>,
    role_arn: String,
    session_name: String,
    cached: RwLock<Option<TemporaryCredentials>>,
}

impl AssumedRoleProvider {
    /// Create a provider for `role_arn`. Nothing is fetched until first use.
    pub fn new(assumer: Arc<dyn RoleAssumer>, role_arn: impl Into<String>) -> Self {
        Self {
            assumer,
            role_arn: role_arn.into(),
            session_name: format!("export-sink-{}", Utc::now().timestamp_millis()),
            cached: RwLock::new(None),
        }
    }

    /// Role this provider assumes
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// Session name sent with the role assumption
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Get valid credentials, assuming the role again if necessary
    pub async fn credentials(&self) -> Result<TemporaryCredentials> {
        {
            let cached = self.cached.read().await;
            if let Some(creds) = cached.as_ref() {
                if !creds.is_expired() {
                    return Ok(creds.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(creds) = cached.as_ref() {
            if !creds.is_expired() {
                return Ok(creds.clone());
            }
        }

        debug!(role_arn = %self.role_arn, session = %self.session_name, "Assuming role");
        let creds = self
            .assumer
            .assume_role(&self.role_arn, &self.session_name)
            .await?;
        if creds.access_key_id.is_empty() || creds.secret_access_key.is_empty() {
            return Err(Error::credential(format!(
                "Role {} returned empty credentials",
                self.role_arn
            )));
        }
        debug!(
            role_arn = %self.role_arn,
            expires_at = ?creds.expires_at,
            "Assumed role"
        );
        *cached = Some(creds.clone());
        Ok(creds)
    }
}

#[async_trait]
impl CredentialProvider for AssumedRoleProvider {
    type Credential = AwsCredential;

    async fn get_credential(&self) -> object_store::Result<Arc<AwsCredential>> {
        let creds = self
            .credentials()
            .await
            .map_err(|e| object_store::Error::Generic {
                store: "S3",
                source: Box::new(e),
            })?;
        Ok(Arc::new(creds.to_aws_credential()))
    }
}
