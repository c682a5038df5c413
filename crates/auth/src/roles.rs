use std::borrow::{Borrow, Cow};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Grant;

/// Role name used for RBAC (e.g. "admin", "user", "guest").
///
/// Roles are opaque strings at this layer; the local policy table and the
/// remote policy engine give them meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Role assumed when the authentication authority omits one.
    pub const DEFAULT: &'static str = "user";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static definition of a role in the local policy table.
///
/// Inheritance is single-parent: `parent` names at most one role whose grants
/// are accumulated on top of this role's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    pub name: Role,
    pub grants: BTreeSet<Grant>,
    pub parent: Option<Role>,
}

impl RoleDefinition {
    pub fn new<I, G>(name: impl Into<Cow<'static, str>>, grants: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<Grant>,
    {
        Self {
            name: Role::new(name),
            grants: grants.into_iter().map(Into::into).collect(),
            parent: None,
        }
    }

    pub fn inherits(mut self, parent: impl Into<Cow<'static, str>>) -> Self {
        self.parent = Some(Role::new(parent));
        self
    }
}
