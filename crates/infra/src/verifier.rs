//! HTTP client for the authentication authority.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use accessgate_auth::{CredentialVerifier, InvalidCredential, Principal, Role};
use accessgate_core::{PrincipalId, RoleId};

use crate::discovery::{AllFailed, AuthHeaders, CandidateTable, EndpointDiscovery, OperationPayload};
use crate::retry::{RetryPolicy, retry};

/// What to do when no upstream endpoint answered at all.
///
/// This is a security-relevant choice and has no implicit default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailablePolicy {
    /// Treat total upstream unavailability as success (mock principal / valid session).
    FailOpen,
    /// Treat total upstream unavailability as a rejection.
    FailClosed,
}

impl UnavailablePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailOpen => "fail-open",
            Self::FailClosed => "fail-closed",
        }
    }
}

impl core::fmt::Display for UnavailablePolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown unavailable policy '{0}' (expected 'fail-open' or 'fail-closed')")]
pub struct UnknownUnavailablePolicy(pub String);

impl core::str::FromStr for UnavailablePolicy {
    type Err = UnknownUnavailablePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "closed" => Ok(Self::FailClosed),
            other => Err(UnknownUnavailablePolicy(other.to_string())),
        }
    }
}

/// Principal returned under `FailOpen` when the authority is unreachable.
pub fn mock_principal() -> Principal {
    Principal::new(
        PrincipalId::new("mock-user-id"),
        Role::new("user"),
        RoleId::new("user-role-id"),
    )
}

#[derive(Debug, Deserialize)]
struct ValidateTokenResponse {
    valid: bool,
    #[serde(default)]
    user: Option<UserPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct UserPayload {
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "roleId", alias = "role_id")]
    role_id: Option<JsonValue>,
}

/// Upstream ids are strings or numbers depending on the backing store.
fn id_string(value: Option<JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl ValidateTokenResponse {
    fn into_principal(self) -> Result<Principal, InvalidCredential> {
        if !self.valid {
            return Err(InvalidCredential::Rejected);
        }

        let user = self.user.unwrap_or_default();
        let id = id_string(user.id).ok_or(InvalidCredential::MissingIdentity)?;
        let role = user
            .role
            .filter(|r| !r.trim().is_empty())
            .map(Role::new)
            .unwrap_or_default();
        let role_id = id_string(user.role_id).unwrap_or_else(|| role.to_string());

        Ok(Principal::new(PrincipalId::new(id), role, RoleId::new(role_id)))
    }
}

/// Credential verifier backed by the authentication authority's HTTP API.
pub struct HttpCredentialVerifier {
    discovery: EndpointDiscovery,
    table: CandidateTable,
    on_unavailable: UnavailablePolicy,
    service_secret: Option<String>,
    retry: RetryPolicy,
}

impl HttpCredentialVerifier {
    pub fn new(
        discovery: EndpointDiscovery,
        table: CandidateTable,
        on_unavailable: UnavailablePolicy,
    ) -> Self {
        Self {
            discovery,
            table,
            on_unavailable,
            service_secret: None,
            retry: RetryPolicy::once(),
        }
    }

    pub fn with_service_secret(mut self, secret: Option<String>) -> Self {
        self.service_secret = secret;
        self
    }

    /// Retry the whole endpoint resolution when every candidate fails.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn unavailable(&self, error: AllFailed) -> Result<Principal, InvalidCredential> {
        match self.on_unavailable {
            UnavailablePolicy::FailOpen => {
                tracing::warn!(
                    %error,
                    policy = %self.on_unavailable,
                    "authentication authority unreachable; returning mock principal"
                );
                Ok(mock_principal())
            }
            UnavailablePolicy::FailClosed => {
                tracing::warn!(
                    %error,
                    policy = %self.on_unavailable,
                    "authentication authority unreachable; rejecting credential"
                );
                Err(InvalidCredential::Unavailable)
            }
        }
    }
}

#[async_trait]
impl CredentialVerifier for HttpCredentialVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, InvalidCredential> {
        // The authority has been seen reading the token from either place.
        let auth = AuthHeaders::new()
            .bearer(token)
            .service_secret(self.service_secret.as_deref());
        let payload = OperationPayload::Token { token };

        let outcome = retry(&self.retry, "validate-token", || {
            self.discovery
                .resolve::<ValidateTokenResponse>(&self.table, &payload, &auth)
        })
        .await;

        match outcome {
            Ok(resolved) => resolved.value.into_principal(),
            Err(error) => self.unavailable(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::discovery::testing::ScriptedTransport;

    const PRIMARY: &str = "http://auth/api/service/validate-token";
    const SECONDARY: &str = "http://auth/api/auth/validate";
    const TERTIARY: &str = "http://auth/validate-token";

    fn verifier(transport: Arc<ScriptedTransport>, policy: UnavailablePolicy) -> HttpCredentialVerifier {
        HttpCredentialVerifier::new(
            EndpointDiscovery::new(transport),
            CandidateTable::validate_token("http://auth"),
            policy,
        )
        .with_service_secret(Some("shared".to_string()))
    }

    #[tokio::test]
    async fn maps_valid_response_to_principal() {
        let transport = Arc::new(ScriptedTransport::new().json(
            PRIMARY,
            200,
            json!({ "valid": true, "user": { "id": "u-1", "role": "admin", "roleId": "r-admin" } }),
        ));
        let v = verifier(transport.clone(), UnavailablePolicy::FailClosed);

        let p = v.verify("tok").await.unwrap();
        assert_eq!(p.id.as_str(), "u-1");
        assert_eq!(p.role.as_str(), "admin");
        assert_eq!(p.role_id.as_str(), "r-admin");

        let call = &transport.calls()[0];
        assert_eq!(call.body, Some(json!({ "token": "tok" })));
        assert_eq!(call.header("Authorization"), Some("Bearer tok"));
        assert_eq!(call.header("X-Service-Secret"), Some("shared"));
    }

    #[tokio::test]
    async fn missing_role_defaults_to_user() {
        let transport = Arc::new(ScriptedTransport::new().json(
            PRIMARY,
            200,
            json!({ "valid": true, "user": { "id": 42, "email": "a@example.com" } }),
        ));
        let p = verifier(transport, UnavailablePolicy::FailClosed)
            .verify("tok")
            .await
            .unwrap();
        assert_eq!(p.id.as_str(), "42");
        assert_eq!(p.role.as_str(), "user");
        assert_eq!(p.role_id.as_str(), "user");
    }

    #[tokio::test]
    async fn explicit_rejection_is_definitive() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json(PRIMARY, 200, json!({ "valid": false, "message": "Token revoked" }))
                .json(SECONDARY, 200, json!({ "valid": true, "user": { "id": "x" } })),
        );
        let v = verifier(transport.clone(), UnavailablePolicy::FailOpen);

        assert_eq!(v.verify("tok").await, Err(InvalidCredential::Rejected));
        assert_eq!(transport.called_urls(), vec![PRIMARY]);
    }

    #[tokio::test]
    async fn unauthorized_status_falls_through_to_next_candidate() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json(PRIMARY, 401, json!({ "valid": false, "message": "Invalid token" }))
                .json(SECONDARY, 200, json!({ "valid": true, "user": { "id": "u-2" } })),
        );
        let p = verifier(transport.clone(), UnavailablePolicy::FailClosed)
            .verify("tok")
            .await
            .unwrap();

        assert_eq!(p.id.as_str(), "u-2");
        assert_eq!(transport.called_urls(), vec![PRIMARY, SECONDARY]);
    }

    #[tokio::test]
    async fn unauthorized_everywhere_is_unavailable_not_rejected() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json(PRIMARY, 401, json!({ "valid": false }))
                .json(SECONDARY, 401, json!({ "valid": false }))
                .json(TERTIARY, 401, json!({ "valid": false })),
        );
        let v = verifier(transport.clone(), UnavailablePolicy::FailClosed);

        assert_eq!(v.verify("tok").await, Err(InvalidCredential::Unavailable));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn valid_without_identity_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new().json(PRIMARY, 200, json!({ "valid": true })));
        let v = verifier(transport, UnavailablePolicy::FailOpen);
        assert_eq!(v.verify("tok").await, Err(InvalidCredential::MissingIdentity));
    }

    #[tokio::test]
    async fn unexpected_shapes_fall_through_to_later_candidates() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json(PRIMARY, 401, json!({ "message": "Invalid service authentication" }))
                .json(SECONDARY, 404, json!({ "error": "not found" }))
                .json(TERTIARY, 200, json!({ "valid": true, "user": { "id": "u-3" } })),
        );
        let p = verifier(transport.clone(), UnavailablePolicy::FailClosed)
            .verify("tok")
            .await
            .unwrap();
        assert_eq!(p.id.as_str(), "u-3");
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn unreachable_authority_fail_closed() {
        let transport = Arc::new(ScriptedTransport::new());
        let v = verifier(transport.clone(), UnavailablePolicy::FailClosed);
        assert_eq!(v.verify("tok").await, Err(InvalidCredential::Unavailable));
        assert_eq!(transport.called_urls(), vec![PRIMARY, SECONDARY, TERTIARY]);
    }

    #[tokio::test]
    async fn unreachable_authority_fail_open() {
        let transport = Arc::new(ScriptedTransport::new());
        let v = verifier(transport, UnavailablePolicy::FailOpen);
        assert_eq!(v.verify("tok").await, Ok(mock_principal()));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_wraps_whole_resolution() {
        let transport = Arc::new(ScriptedTransport::new());
        let v = verifier(transport.clone(), UnavailablePolicy::FailClosed)
            .with_retry(RetryPolicy::new(2, std::time::Duration::from_millis(10)));

        assert_eq!(v.verify("tok").await, Err(InvalidCredential::Unavailable));
        // Two full passes over the three candidates.
        assert_eq!(transport.calls().len(), 6);
    }

    #[test]
    fn parses_unavailable_policy() {
        assert_eq!("fail-open".parse::<UnavailablePolicy>(), Ok(UnavailablePolicy::FailOpen));
        assert_eq!(" FAIL-CLOSED ".parse::<UnavailablePolicy>(), Ok(UnavailablePolicy::FailClosed));
        assert!("maybe".parse::<UnavailablePolicy>().is_err());
    }
}
