//! Strongly-typed identifiers used across services.
//!
//! Upstream services hand out identifiers as opaque strings (UUIDs, database
//! keys, or literal mock values), so these wrap `String` rather than `Uuid`.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of an authenticated principal (as issued by the authentication authority).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

/// Identifier of a role in the remote policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

/// Identifier of a user-management session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw identifier without validation.
            ///
            /// Prefer `parse()` for values that come from untrusted input.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::invalid_id(format!("{}: empty", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_newtype!(PrincipalId, "PrincipalId");
impl_string_newtype!(RoleId, "RoleId");
impl_string_newtype!(SessionId, "SessionId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let id: PrincipalId = "  user-42 ".parse().unwrap();
        assert_eq!(id.as_str(), "user-42");
    }

    #[test]
    fn parse_rejects_blank() {
        let err = "   ".parse::<RoleId>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidId(msg) if msg.starts_with("RoleId")));
    }

    #[test]
    fn serializes_transparently() {
        let id = SessionId::new("sess-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sess-1\"");
    }
}
