//! Credential resolution
//!
//! An export either writes with the storage client's ambient credentials or
//! assumes a role first. Role assumption happens at open time and is
//! retrieved eagerly, so a bad role fails the statement before any byte is
//! written rather than on the first upload.

mod provider;
mod sts;
mod types;

pub use provider::AssumedRoleProvider;
pub use sts::StsRoleAssumer;
pub use types::{CredentialSource, TemporaryCredentials};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Exchanges the caller's identity for short-lived credentials of a role
#[async_trait]
pub trait RoleAssumer: Send + Sync + std::fmt::Debug {
    /// Assume `role_arn` under the given session name
    async fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<TemporaryCredentials>;
}

/// Resolve the credential source for one sink.
///
/// With no (or an empty) role ARN the ambient chain is used unmodified.
/// Otherwise the role is assumed once through a fresh caching provider and
/// any failure is returned as a credential error.
pub async fn resolve(
    role_arn: Option<&str>,
    assumer: Arc<dyn RoleAssumer>,
) -> Result<CredentialSource> {
    let Some(role_arn) = role_arn.filter(|arn| !arn.is_empty()) else {
        return Ok(CredentialSource::Ambient);
    };

    info!(role_arn, "Assuming role for export");
    let provider = AssumedRoleProvider::new(assumer, role_arn);
    provider.credentials().await?;
    Ok(CredentialSource::AssumedRole(Arc::new(provider)))
}

#[cfg(test)]
mod tests;
