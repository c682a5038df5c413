//! `accessgate-auth`: pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP: upstream services are
//! reached through the `CredentialVerifier` and `PolicyResolver` traits.

pub mod authorize;
pub mod decision;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod request;
pub mod roles;

pub use authorize::{AuthorizationEngine, AuthzError, CredentialVerifier, InvalidCredential, PolicyResolver};
pub use decision::{AuthorizationDecision, DecisionSource};
pub use permissions::Grant;
pub use policy::{DenialKind, DenialReason, LocalPolicyTable, PolicyExplanation, PolicyTableError};
pub use principal::Principal;
pub use request::{AuthorizationRequest, parse_bearer_header};
pub use roles::{Role, RoleDefinition};
