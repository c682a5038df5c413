//! `accessgate-core`: identifiers and validation primitives.
//!
//! This crate has no IO and no async; everything else builds on it.

pub mod error;
pub mod id;

pub use error::{ValidationError, ValidationResult};
pub use id::{PrincipalId, RoleId, SessionId};
