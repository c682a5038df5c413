use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use accessgate_core::{RoleId, ValidationError};

use crate::{AuthorizationDecision, AuthorizationRequest, LocalPolicyTable, Principal, Role};

/// Why a credential did not produce a principal.
///
/// These are expected outcomes, not faults: every variant ends in a
/// `denied-invalid-token` decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidCredential {
    #[error("credential rejected by the authentication authority")]
    Rejected,

    #[error("authentication authority accepted the credential but returned no identity")]
    MissingIdentity,

    #[error("authentication authority unavailable (fail-closed)")]
    Unavailable,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The request can never be decided; no upstream call was made.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),
}

/// Turns an opaque bearer token into a principal or a definitive rejection.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, InvalidCredential>;
}

/// Asks the remote policy engine for a decision.
///
/// `None` means no answer was obtained, which is distinct from `Some(false)`.
#[async_trait]
pub trait PolicyResolver: Send + Sync {
    async fn check_policy(
        &self,
        role_id: &RoleId,
        role: &Role,
        action: &str,
        resource: &str,
    ) -> Option<bool>;
}

/// Stages of a single authorization flow.
enum Stage<'a> {
    Start,
    TokenCheck(&'a str),
    PolicyCheck(Principal),
    FallbackCheck(Principal),
    Decided(AuthorizationDecision),
}

/// Orchestrates credential verification, remote policy, and local fallback.
///
/// Remote policy always wins when it answers; the local table is consulted
/// only when the remote engine gives no answer. The engine holds no
/// per-request state and can serve concurrent requests.
#[derive(Clone)]
pub struct AuthorizationEngine {
    verifier: Arc<dyn CredentialVerifier>,
    resolver: Arc<dyn PolicyResolver>,
    policy: Arc<LocalPolicyTable>,
}

impl AuthorizationEngine {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        resolver: Arc<dyn PolicyResolver>,
        policy: Arc<LocalPolicyTable>,
    ) -> Self {
        Self {
            verifier,
            resolver,
            policy,
        }
    }

    pub fn policy(&self) -> &LocalPolicyTable {
        &self.policy
    }

    /// Decide one request.
    ///
    /// Denial is returned as a decision; the only error is a malformed request,
    /// detected before any upstream call.
    pub async fn decide(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationDecision, AuthzError> {
        request.validate()?;

        let mut stage = Stage::Start;
        loop {
            stage = match stage {
                Stage::Start => match request.bearer_token() {
                    Some(token) => Stage::TokenCheck(token),
                    None => {
                        tracing::debug!("no bearer token on request");
                        Stage::Decided(AuthorizationDecision::denied_no_token())
                    }
                },

                Stage::TokenCheck(token) => match self.verifier.verify(token).await {
                    Ok(principal) => Stage::PolicyCheck(principal),
                    Err(reason) => {
                        tracing::info!(%reason, "credential verification failed");
                        Stage::Decided(AuthorizationDecision::denied_invalid_token())
                    }
                },

                Stage::PolicyCheck(principal) => {
                    let remote = self
                        .resolver
                        .check_policy(
                            &principal.role_id,
                            &principal.role,
                            &request.action,
                            &request.resource,
                        )
                        .await;
                    match remote {
                        Some(allowed) => {
                            Stage::Decided(AuthorizationDecision::remote(allowed, principal))
                        }
                        None => {
                            tracing::warn!(
                                role = %principal.role,
                                "remote policy engine gave no answer; using local policy table"
                            );
                            Stage::FallbackCheck(principal)
                        }
                    }
                }

                Stage::FallbackCheck(principal) => {
                    let owner_match = self.owner_match(request, &principal);
                    let allowed =
                        self.policy
                            .evaluate(principal.role.as_str(), &request.action, owner_match);
                    Stage::Decided(AuthorizationDecision::local(allowed, principal))
                }

                Stage::Decided(decision) => {
                    tracing::info!(
                        action = %request.action,
                        resource = %request.resource,
                        allowed = decision.allowed(),
                        source = %decision.source(),
                        principal = decision.principal().map(|p| p.id.as_str()),
                        "authorization decided"
                    );
                    return Ok(decision);
                }
            };
        }
    }

    fn owner_match(&self, request: &AuthorizationRequest, principal: &Principal) -> bool {
        if let Some(claimed) = request.requester_id.as_deref() {
            if claimed != principal.id.as_str() {
                tracing::warn!(
                    claimed,
                    verified = %principal.id,
                    "client-supplied requester id differs from verified principal; ignoring it"
                );
            }
        }
        principal.owns(request.owner_id.as_deref())
    }
}
