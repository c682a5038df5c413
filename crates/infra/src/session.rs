//! Session validation against the user-management service.
//!
//! Unlike credential verification this path retries the whole endpoint
//! resolution before falling back, because the user-management service is
//! known to restart frequently.

use serde::{Deserialize, Serialize};

use accessgate_core::SessionId;

use crate::discovery::{AuthHeaders, CandidateTable, EndpointDiscovery, OperationPayload};
use crate::retry::{RetryPolicy, retry};
use crate::verifier::UnavailablePolicy;

#[derive(Debug, Deserialize)]
struct SessionResponse {
    /// Absent means the service accepted the session without saying so.
    #[serde(default)]
    valid: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionFailure {
    SessionExpiredOrInvalid,
    UserManagementUnavailable,
}

/// Outcome of a session validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub valid: bool,
    /// The answer came from the unavailable policy, not from upstream.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SessionFailure>,
}

pub struct SessionValidator {
    discovery: EndpointDiscovery,
    table: CandidateTable,
    retry: RetryPolicy,
    on_unavailable: UnavailablePolicy,
    service_secret: Option<String>,
}

impl SessionValidator {
    pub fn new(
        discovery: EndpointDiscovery,
        table: CandidateTable,
        retry: RetryPolicy,
        on_unavailable: UnavailablePolicy,
    ) -> Self {
        Self {
            discovery,
            table,
            retry,
            on_unavailable,
            service_secret: None,
        }
    }

    pub fn with_service_secret(mut self, secret: Option<String>) -> Self {
        self.service_secret = secret;
        self
    }

    pub async fn validate(&self, session_id: &SessionId, token: &str) -> SessionStatus {
        let payload = OperationPayload::Session {
            session_id: session_id.as_str(),
            token,
        };
        let auth = AuthHeaders::new()
            .bearer(token)
            .service_secret(self.service_secret.as_deref());

        let outcome = retry(&self.retry, "validate-session", || {
            self.discovery
                .resolve::<SessionResponse>(&self.table, &payload, &auth)
        })
        .await;

        match outcome {
            Ok(resolved) => {
                let valid = resolved.value.valid.unwrap_or(true);
                SessionStatus {
                    session_id: session_id.clone(),
                    valid,
                    fallback: false,
                    reason: (!valid).then_some(SessionFailure::SessionExpiredOrInvalid),
                }
            }
            Err(error) => {
                let valid = self.on_unavailable == UnavailablePolicy::FailOpen;
                tracing::warn!(
                    %error,
                    session_id = %session_id,
                    policy = %self.on_unavailable,
                    "session validation unavailable; applying fallback"
                );
                SessionStatus {
                    session_id: session_id.clone(),
                    valid,
                    fallback: true,
                    reason: Some(SessionFailure::UserManagementUnavailable),
                }
            }
        }
    }
}
