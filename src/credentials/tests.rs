//! Tests for the credentials module

use super::*;
use crate::error::{Error, ErrorKind};
use crate::test_util::FakeAssumer;
use chrono::{TimeZone, Utc};
use object_store::CredentialProvider;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROLE: &str = "arn:aws:iam::123456789012:role/exporter";

// ============================================================================
// Resolver Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_without_role_is_ambient() {
    let assumer = Arc::new(FakeAssumer::ok());
    let source = resolve(None, assumer.clone()).await.unwrap();
    assert!(matches!(source, CredentialSource::Ambient));
    assert_eq!(assumer.calls(), 0);
}

#[tokio::test]
async fn test_resolve_empty_role_is_ambient() {
    let assumer = Arc::new(FakeAssumer::ok());
    let source = resolve(Some(""), assumer.clone()).await.unwrap();
    assert!(!source.is_assumed_role());
    assert_eq!(assumer.calls(), 0);
}

#[tokio::test]
async fn test_resolve_role_retrieves_eagerly() {
    let assumer = Arc::new(FakeAssumer::ok());
    let source = resolve(Some(ROLE), assumer.clone()).await.unwrap();
    assert!(source.is_assumed_role());
    assert_eq!(assumer.calls(), 1);

    let CredentialSource::AssumedRole(provider) = source else {
        panic!("expected assumed role");
    };
    assert_eq!(provider.role_arn(), ROLE);
    assert!(provider.session_name().starts_with("export-sink-"));

    // Served from the cache
    provider.credentials().await.unwrap();
    assert_eq!(assumer.calls(), 1);
}

#[tokio::test]
async fn test_resolve_role_failure_is_credential_error() {
    let assumer = Arc::new(FakeAssumer::failing("AccessDenied"));
    let err = resolve(Some(ROLE), assumer).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Credential);
    assert!(err.to_string().contains("AccessDenied"));
}

// ============================================================================
// Provider Tests
// ============================================================================

#[tokio::test]
async fn test_provider_refreshes_expired_credentials() {
    let expired = TemporaryCredentials::new(
        "AKIA",
        "secret",
        Some("token".to_string()),
        Some(Utc::now() - chrono::Duration::seconds(10)),
    );
    let assumer = Arc::new(FakeAssumer::with(Ok(expired)));
    let provider = AssumedRoleProvider::new(assumer.clone(), ROLE);

    provider.credentials().await.unwrap();
    provider.credentials().await.unwrap();
    assert_eq!(assumer.calls(), 2);
}

#[tokio::test]
async fn test_provider_rejects_empty_credentials() {
    let empty = TemporaryCredentials::new("", "", None, None);
    let provider = AssumedRoleProvider::new(Arc::new(FakeAssumer::with(Ok(empty))), ROLE);
    let err = provider.credentials().await.unwrap_err();
    assert!(matches!(err, Error::Credential { .. }));
}

#[tokio::test]
async fn test_provider_as_object_store_credential_provider() {
    let provider = AssumedRoleProvider::new(Arc::new(FakeAssumer::ok()), ROLE);
    let credential = provider.get_credential().await.unwrap();
    assert_eq!(credential.key_id, "AKIAFAKE");
    assert_eq!(credential.secret_key, "fake-secret");
    assert_eq!(credential.token.as_deref(), Some("fake-token"));
}

#[tokio::test]
async fn test_provider_error_maps_to_object_store_error() {
    let provider = AssumedRoleProvider::new(Arc::new(FakeAssumer::failing("nope")), ROLE);
    let err = provider.get_credential().await.unwrap_err();
    assert!(matches!(err, object_store::Error::Generic { .. }));
}

// ============================================================================
// Type Tests
// ============================================================================

#[test]
fn test_credentials_expiry() {
    let fresh = TemporaryCredentials::new(
        "a",
        "b",
        None,
        Some(Utc::now() + chrono::Duration::hours(1)),
    );
    assert!(!fresh.is_expired());

    let nearly = TemporaryCredentials::new(
        "a",
        "b",
        None,
        Some(Utc::now() + chrono::Duration::seconds(5)),
    );
    assert!(nearly.is_expired());

    let forever = TemporaryCredentials::new("a", "b", None, None);
    assert!(!forever.is_expired());
}

#[test]
fn test_credentials_debug_redacts_secrets() {
    let creds = TemporaryCredentials::new("AKIA", "super-secret", Some("tok".to_string()), None);
    let debug = format!("{creds:?}");
    assert!(debug.contains("AKIA"));
    assert!(!debug.contains("super-secret"));
    assert!(!debug.contains("tok\""));
}

// ============================================================================
// STS Tests
// ============================================================================

const ASSUME_ROLE_RESPONSE: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>ASIATEMPORARY</AccessKeyId>
      <SecretAccessKey>temporary-secret</SecretAccessKey>
      <SessionToken>temporary-token</SessionToken>
      <Expiration>2099-01-01T00:00:00Z</Expiration>
    </Credentials>
    <AssumedRoleUser>
      <AssumedRoleId>AROA123:export-sink</AssumedRoleId>
      <Arn>arn:aws:sts::123456789012:assumed-role/exporter/export-sink</Arn>
    </AssumedRoleUser>
  </AssumeRoleResult>
  <ResponseMetadata>
    <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
  </ResponseMetadata>
</AssumeRoleResponse>"#;

const ACCESS_DENIED_RESPONSE: &str = r#"<ErrorResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <Error>
    <Type>Sender</Type>
    <Code>AccessDenied</Code>
    <Message>User is not authorized to perform: sts:AssumeRole</Message>
  </Error>
  <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
</ErrorResponse>"#;

fn sts_assumer(server: &MockServer) -> StsRoleAssumer {
    StsRoleAssumer::new()
        .with_region("us-east-1")
        .with_endpoint(server.uri())
        .with_static_credentials("AKIABASE", "base-secret")
}

#[tokio::test]
async fn test_sts_assume_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=AssumeRole"))
        .and(body_string_contains("RoleSessionName=export-sink-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/xml")
                .set_body_string(ASSUME_ROLE_RESPONSE),
        )
        .expect(1)
        .mount(&server)
        .await;

    let creds = sts_assumer(&server)
        .assume_role(ROLE, "export-sink-test")
        .await
        .unwrap();

    assert_eq!(creds.access_key_id, "ASIATEMPORARY");
    assert_eq!(creds.secret_access_key, "temporary-secret");
    assert_eq!(creds.session_token.as_deref(), Some("temporary-token"));
    assert_eq!(
        creds.expires_at,
        Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_sts_access_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("content-type", "text/xml")
                .set_body_string(ACCESS_DENIED_RESPONSE),
        )
        .mount(&server)
        .await;

    let err = sts_assumer(&server)
        .assume_role(ROLE, "export-sink-test")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Credential);
}

#[test]
fn test_sts_debug_redacts_base_credentials() {
    let assumer = StsRoleAssumer::new().with_static_credentials("AKIABASE", "base-secret");
    let debug = format!("{assumer:?}");
    assert!(!debug.contains("base-secret"));
}
