//! Endpoint discovery: try a prioritized list of candidate endpoints for a
//! logical upstream operation until one returns a usable answer.
//!
//! Candidates are tried strictly in order and never concurrently. The first
//! candidate whose response parses into the operation's expected shape wins
//! and later candidates are not contacted. There is no retry here; callers
//! wrap `resolve` with [`crate::retry`] when they want one.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::transport::{CandidateError, HttpMethod, HttpTransport, OutboundRequest};

/// Logical upstream operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ValidateToken,
    CheckPolicy,
    ValidateSession,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidateToken => "validate-token",
            Self::CheckPolicy => "check-policy",
            Self::ValidateSession => "validate-session",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the operation payload is laid out on the wire for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// JSON body `{ "token": … }`.
    TokenBody,
    /// JSON body `{ "sessionId": …, "token": … }`.
    SessionBody,
    /// Query `role_id=…&action=…&resource=…`.
    RoleIdQuery,
    /// Query `role=…&action=…&resource=…`.
    RoleNameQuery,
}

/// Data a logical operation carries, independent of wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPayload<'a> {
    Token {
        token: &'a str,
    },
    Session {
        session_id: &'a str,
        token: &'a str,
    },
    Policy {
        role_id: &'a str,
        role: &'a str,
        action: &'a str,
        resource: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub path: String,
    pub method: HttpMethod,
    pub shape: RequestShape,
}

impl EndpointCandidate {
    pub fn get(path: impl Into<String>, shape: RequestShape) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Get,
            shape,
        }
    }

    pub fn post(path: impl Into<String>, shape: RequestShape) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Post,
            shape,
        }
    }

    fn render(
        &self,
        url: String,
        payload: &OperationPayload<'_>,
        auth: &AuthHeaders,
    ) -> Result<OutboundRequest, CandidateError> {
        let mut request = match self.method {
            HttpMethod::Get => OutboundRequest::get(url),
            HttpMethod::Post => OutboundRequest::post(url, serde_json::Value::Null),
        };

        match (self.shape, payload) {
            (RequestShape::TokenBody, OperationPayload::Token { token })
            | (RequestShape::TokenBody, OperationPayload::Session { token, .. }) => {
                request.body = Some(json!({ "token": token }));
            }
            (RequestShape::SessionBody, OperationPayload::Session { session_id, token }) => {
                request.body = Some(json!({ "sessionId": session_id, "token": token }));
            }
            (
                RequestShape::RoleIdQuery,
                OperationPayload::Policy {
                    role_id,
                    action,
                    resource,
                    ..
                },
            ) => {
                request.query = vec![
                    ("role_id".to_string(), role_id.to_string()),
                    ("action".to_string(), action.to_string()),
                    ("resource".to_string(), resource.to_string()),
                ];
            }
            (
                RequestShape::RoleNameQuery,
                OperationPayload::Policy {
                    role,
                    action,
                    resource,
                    ..
                },
            ) => {
                request.query = vec![
                    ("role".to_string(), role.to_string()),
                    ("action".to_string(), action.to_string()),
                    ("resource".to_string(), resource.to_string()),
                ];
            }
            (shape, payload) => {
                return Err(CandidateError::Request(format!(
                    "shape {shape:?} cannot carry payload {}",
                    payload_kind(payload)
                )));
            }
        }

        if request.method == HttpMethod::Get {
            request.body = None;
        }
        request.headers = auth.to_headers();
        Ok(request)
    }
}

fn payload_kind(payload: &OperationPayload<'_>) -> &'static str {
    match payload {
        OperationPayload::Token { .. } => "token",
        OperationPayload::Session { .. } => "session",
        OperationPayload::Policy { .. } => "policy",
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CandidateTableError {
    #[error("no endpoint candidates configured for {0}")]
    Empty(Operation),
}

/// Ordered candidates for one operation against one upstream base URL.
///
/// Order encodes priority. A table is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTable {
    operation: Operation,
    base_url: String,
    candidates: Vec<EndpointCandidate>,
}

impl CandidateTable {
    pub fn new(
        operation: Operation,
        base_url: impl Into<String>,
        candidates: Vec<EndpointCandidate>,
    ) -> Result<Self, CandidateTableError> {
        if candidates.is_empty() {
            return Err(CandidateTableError::Empty(operation));
        }
        Ok(Self {
            operation,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            candidates,
        })
    }

    /// Authentication authority token validation endpoints.
    pub fn validate_token(base_url: impl Into<String>) -> Self {
        Self {
            operation: Operation::ValidateToken,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            candidates: vec![
                EndpointCandidate::post("/api/service/validate-token", RequestShape::TokenBody),
                EndpointCandidate::post("/api/auth/validate", RequestShape::TokenBody),
                EndpointCandidate::post("/validate-token", RequestShape::TokenBody),
            ],
        }
    }

    /// Policy engine check endpoints, role-id keyed first, role-name keyed last.
    pub fn check_policy(base_url: impl Into<String>) -> Self {
        Self {
            operation: Operation::CheckPolicy,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            candidates: vec![
                EndpointCandidate::get("/api/v1/check", RequestShape::RoleIdQuery),
                EndpointCandidate::get("/check", RequestShape::RoleIdQuery),
                EndpointCandidate::get("/api/v1/check", RequestShape::RoleNameQuery),
            ],
        }
    }

    /// User-management session validation endpoints.
    pub fn validate_session(base_url: impl Into<String>) -> Self {
        Self {
            operation: Operation::ValidateSession,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            candidates: vec![
                EndpointCandidate::post("/api/auth/validate", RequestShape::SessionBody),
                EndpointCandidate::post("/api/service/validate-token", RequestShape::SessionBody),
                EndpointCandidate::post("/check-session", RequestShape::SessionBody),
            ],
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn candidates(&self) -> &[EndpointCandidate] {
        &self.candidates
    }

    pub fn url_for(&self, candidate: &EndpointCandidate) -> String {
        format!("{}{}", self.base_url, candidate.path)
    }
}

/// Credentials attached to every candidate call of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders {
    bearer: Option<String>,
    service_secret: Option<String>,
}

impl AuthHeaders {
    pub const SERVICE_SECRET_HEADER: &'static str = "X-Service-Secret";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn service_secret(mut self, secret: Option<&str>) -> Self {
        self.service_secret = secret.map(str::to_string);
        self
    }

    fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(token) = &self.bearer {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        if let Some(secret) = &self.service_secret {
            headers.push((Self::SERVICE_SECRET_HEADER.to_string(), secret.clone()));
        }
        headers
    }
}

/// Every candidate failed. Carries the last observed error for diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("all {attempts} {operation} endpoints failed; last error: {last_error}")]
pub struct AllFailed {
    pub operation: Operation,
    pub attempts: usize,
    pub last_error: CandidateError,
}

/// A structurally valid answer and the candidate that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub url: String,
    /// 1-based position of the winning candidate.
    pub attempt: usize,
}

#[derive(Clone)]
pub struct EndpointDiscovery {
    transport: Arc<dyn HttpTransport>,
}

impl EndpointDiscovery {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Try each candidate in order and return the first structurally valid answer.
    pub async fn resolve<T: DeserializeOwned>(
        &self,
        table: &CandidateTable,
        payload: &OperationPayload<'_>,
        auth: &AuthHeaders,
    ) -> Result<Resolved<T>, AllFailed> {
        let operation = table.operation();
        let mut last_error = CandidateError::Request("no candidate attempted".to_string());

        for (index, candidate) in table.candidates().iter().enumerate() {
            let url = table.url_for(candidate);
            tracing::debug!(%operation, method = %candidate.method, %url, "trying endpoint candidate");

            match self.try_candidate::<T>(candidate, url.clone(), payload, auth).await {
                Ok(value) => {
                    tracing::debug!(%operation, %url, attempt = index + 1, "endpoint candidate answered");
                    return Ok(Resolved {
                        value,
                        url,
                        attempt: index + 1,
                    });
                }
                Err(error) => {
                    tracing::debug!(%operation, %url, %error, "endpoint candidate failed");
                    last_error = error;
                }
            }
        }

        Err(AllFailed {
            operation,
            attempts: table.candidates().len(),
            last_error,
        })
    }

    async fn try_candidate<T: DeserializeOwned>(
        &self,
        candidate: &EndpointCandidate,
        url: String,
        payload: &OperationPayload<'_>,
        auth: &AuthHeaders,
    ) -> Result<T, CandidateError> {
        let request = candidate.render(url, payload, auth)?;
        let response = self.transport.execute(request).await?;

        // Only 2xx replies can be answers; any other status is an HTTP error.
        if !(200..=299).contains(&response.status) {
            return Err(CandidateError::Status(response.status));
        }

        serde_json::from_slice::<T>(&response.body).map_err(|e| CandidateError::Shape {
            status: response.status,
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport shared by the infra unit tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::transport::{CandidateError, HttpTransport, OutboundRequest, TransportResponse};

    /// Replays canned outcomes keyed by URL (without query string) and records calls.
    ///
    /// Unscripted URLs fail with a transport error, like an unreachable host.
    #[derive(Default)]
    pub struct ScriptedTransport {
        routes: Mutex<HashMap<String, Vec<Result<TransportResponse, CandidateError>>>>,
        calls: Mutex<Vec<OutboundRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an outcome for `url`; the last queued outcome repeats.
        pub fn on(self, url: &str, outcome: Result<TransportResponse, CandidateError>) -> Self {
            self.routes
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push(outcome);
            self
        }

        pub fn json(self, url: &str, status: u16, body: serde_json::Value) -> Self {
            self.on(
                url,
                Ok(TransportResponse {
                    status,
                    body: serde_json::to_vec(&body).unwrap(),
                }),
            )
        }

        pub fn calls(&self) -> Vec<OutboundRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn called_urls(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.url).collect()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(
            &self,
            request: OutboundRequest,
        ) -> Result<TransportResponse, CandidateError> {
            self.calls.lock().unwrap().push(request.clone());
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&request.url) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) if !queue.is_empty() => queue[0].clone(),
                _ => Err(CandidateError::Transport(format!(
                    "connection refused: {}",
                    request.url
                ))),
            }
        }
    }
}
