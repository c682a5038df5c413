use accessgate_core::{ValidationError, ValidationResult};

/// One inbound "may this principal do this?" question.
///
/// Built by the calling service layer per incoming call and never modified.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AuthorizationRequest {
    pub token: Option<String>,
    pub action: String,
    pub resource: String,
    pub owner_id: Option<String>,
    /// Client-supplied requester identity. Informational only: ownership is
    /// always checked against the verified principal.
    pub requester_id: Option<String>,
    pub session_id: Option<String>,
}

impl AuthorizationRequest {
    pub fn new(token: Option<String>, action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            token,
            action: action.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_requester(mut self, requester_id: impl Into<String>) -> Self {
        self.requester_id = Some(requester_id.into());
        self
    }

    /// Reject requests that can never be decided.
    pub fn validate(&self) -> ValidationResult<()> {
        ValidationError::require("action", &self.action)?;
        ValidationError::require("resource", &self.resource)?;
        Ok(())
    }

    /// The bearer token, if one is present and well-formed.
    ///
    /// Blank tokens and tokens containing whitespace count as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.token.as_deref()?.trim();
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return None;
        }
        Some(token)
    }
}

impl core::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("action", &self.action)
            .field("resource", &self.resource)
            .field("owner_id", &self.owner_id)
            .field("requester_id", &self.requester_id)
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer_header(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
