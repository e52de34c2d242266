//! Credential types

use super::provider::AssumedRoleProvider;
use chrono::{DateTime, Utc};
use object_store::aws::AwsCredential;
use std::fmt;
use std::sync::Arc;

/// Short-lived credentials returned by a role assumption
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Session token
    pub session_token: Option<String>,
    /// When the credentials expire
    pub expires_at: Option<DateTime<Utc>>,
}

impl TemporaryCredentials {
    /// Create credentials
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expires_at,
        }
    }

    /// Check if the credentials are expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }

    /// Convert to the storage client's credential type
    pub fn to_aws_credential(&self) -> AwsCredential {
        AwsCredential {
            key_id: self.access_key_id.clone(),
            secret_key: self.secret_access_key.clone(),
            token: self.session_token.clone(),
        }
    }
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where the storage client gets its credentials from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// The storage client's default environment/instance chain
    Ambient,
    /// Credentials of an assumed role, cached per sink
    AssumedRole(Arc<AssumedRoleProvider>),
}

impl CredentialSource {
    /// Whether a role was assumed
    pub fn is_assumed_role(&self) -> bool {
        matches!(self, CredentialSource::AssumedRole(_))
    }
}
