use serde::{Deserialize, Serialize};

use accessgate_auth::{AuthorizationDecision, AuthorizationRequest, DecisionSource, Principal, RoleDefinition};
use accessgate_infra::{DependencyHealth, SessionStatus};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /check-session`. The token travels in the `Authorization` header.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAccessRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub resource: String,
    pub owner_id: Option<String>,
    pub requester_id: Option<String>,
    pub session_id: Option<String>,
}

impl CheckAccessRequest {
    pub fn into_authorization_request(self, token: Option<String>) -> AuthorizationRequest {
        AuthorizationRequest {
            token,
            action: self.action,
            resource: self.resource,
            owner_id: self.owner_id,
            requester_id: self.requester_id,
            session_id: self.session_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSessionRequest {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    #[serde(default)]
    pub detailed: bool,
    #[serde(default)]
    pub quick: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainQuery {
    pub action: String,
    #[serde(default)]
    pub owner_match: bool,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub allowed: bool,
    pub source: DecisionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl DecisionResponse {
    pub fn new(decision: &AuthorizationDecision, session_id: Option<String>) -> Self {
        Self {
            allowed: decision.allowed(),
            source: decision.source(),
            principal: decision.principal().cloned(),
            session_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub valid: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<accessgate_infra::SessionFailure>,
}

impl From<SessionStatus> for SessionResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            valid: status.valid,
            session_id: status.session_id.into_inner(),
            fallback: status.fallback,
            reason: status.reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleView {
    pub name: String,
    pub grants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    /// Own grants plus everything inherited.
    pub effective: Vec<String>,
}

impl RoleView {
    pub fn new(definition: &RoleDefinition, effective: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: definition.name.to_string(),
            grants: definition.grants.iter().map(|g| g.as_str().to_string()).collect(),
            inherits: definition.parent.as_ref().map(ToString::to_string),
            effective: effective.into_iter().collect(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<DependencyHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbac: Option<DependencyHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_management: Option<DependencyHealth>,
}
