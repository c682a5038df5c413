use serde::{Deserialize, Serialize};

use crate::Principal;

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSource {
    RemotePolicy,
    LocalPolicy,
    DeniedNoToken,
    DeniedInvalidToken,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemotePolicy => "remote-policy",
            Self::LocalPolicy => "local-policy",
            Self::DeniedNoToken => "denied-no-token",
            Self::DeniedInvalidToken => "denied-invalid-token",
        }
    }

    /// The request never got past credential checks.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::DeniedNoToken | Self::DeniedInvalidToken)
    }
}

impl core::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final allow/deny answer for one request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    allowed: bool,
    source: DecisionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<Principal>,
}

impl AuthorizationDecision {
    pub fn denied_no_token() -> Self {
        Self {
            allowed: false,
            source: DecisionSource::DeniedNoToken,
            principal: None,
        }
    }

    pub fn denied_invalid_token() -> Self {
        Self {
            allowed: false,
            source: DecisionSource::DeniedInvalidToken,
            principal: None,
        }
    }

    pub fn remote(allowed: bool, principal: Principal) -> Self {
        Self {
            allowed,
            source: DecisionSource::RemotePolicy,
            principal: Some(principal),
        }
    }

    pub fn local(allowed: bool, principal: Principal) -> Self {
        Self {
            allowed,
            source: DecisionSource::LocalPolicy,
            principal: Some(principal),
        }
    }

    pub fn allowed(&self) -> bool {
        self.allowed
    }

    pub fn source(&self) -> DecisionSource {
        self.source
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}
