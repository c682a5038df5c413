use serde::{Deserialize, Serialize};

use accessgate_core::{PrincipalId, RoleId};

use crate::Role;

/// Authenticated identity derived from a verified credential.
///
/// Lives for one authorization request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    pub role_id: RoleId,
}

impl Principal {
    pub fn new(id: PrincipalId, role: Role, role_id: RoleId) -> Self {
        Self { id, role, role_id }
    }

    /// Ownership match: the declared owner is present and equals this principal.
    pub fn owns(&self, owner_id: Option<&str>) -> bool {
        owner_id.is_some_and(|owner| owner == self.id.as_str())
    }
}
