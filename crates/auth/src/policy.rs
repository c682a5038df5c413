//! Local policy table: the dependency-free fallback when the remote policy
//! engine cannot be reached.
//!
//! The table is loaded once at startup and never mutated afterwards, so it can
//! be shared behind an `Arc` and read concurrently without locking.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Grant, Role, RoleDefinition};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyTableError {
    #[error("role '{0}' is defined more than once")]
    DuplicateRole(String),

    #[error("role '{role}' inherits from unknown role '{parent}'")]
    UnknownParent { role: String, parent: String },

    #[error("role '{0}' inherits from itself (directly or transitively)")]
    Cycle(String),

    #[error("invalid role table: {0}")]
    Parse(String),
}

/// Immutable role → grant mapping with single-parent inheritance.
#[derive(Debug, Clone)]
pub struct LocalPolicyTable {
    roles: BTreeMap<Role, RoleDefinition>,
}

impl LocalPolicyTable {
    /// Build a table, rejecting duplicate roles, dangling parents, and cycles.
    pub fn new(definitions: impl IntoIterator<Item = RoleDefinition>) -> Result<Self, PolicyTableError> {
        let mut roles = BTreeMap::new();
        for def in definitions {
            if roles.contains_key(&def.name) {
                return Err(PolicyTableError::DuplicateRole(def.name.to_string()));
            }
            roles.insert(def.name.clone(), def);
        }

        for def in roles.values() {
            if let Some(parent) = &def.parent {
                if !roles.contains_key(parent) {
                    return Err(PolicyTableError::UnknownParent {
                        role: def.name.to_string(),
                        parent: parent.to_string(),
                    });
                }
            }
        }

        for name in roles.keys() {
            let mut seen = BTreeSet::new();
            let mut current = Some(name);
            while let Some(role) = current {
                if !seen.insert(role) {
                    return Err(PolicyTableError::Cycle(name.to_string()));
                }
                current = roles.get(role).and_then(|d| d.parent.as_ref());
            }
        }

        Ok(Self { roles })
    }

    /// The built-in admin → user → guest hierarchy.
    pub fn with_default_roles() -> Self {
        let definitions = vec![
            RoleDefinition::new("admin", ["read", "create", "update", "delete"]).inherits("user"),
            RoleDefinition::new("user", ["read", "create:own", "update:own"]).inherits("guest"),
            RoleDefinition::new("guest", ["read"]),
        ];

        Self {
            roles: definitions
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// Load a table from the role-file JSON format:
    ///
    /// ```json
    /// { "admin": { "can": ["read", "delete"], "inherits": ["user"] },
    ///   "user":  { "can": ["read", "update:own"] } }
    /// ```
    ///
    /// Only the first `inherits` entry is followed.
    pub fn from_json_str(json: &str) -> Result<Self, PolicyTableError> {
        let entries: BTreeMap<String, RoleFileEntry> =
            serde_json::from_str(json).map_err(|e| PolicyTableError::Parse(e.to_string()))?;

        let definitions = entries.into_iter().map(|(name, entry)| {
            if entry.inherits.len() > 1 {
                tracing::warn!(
                    role = %name,
                    inherits = ?entry.inherits,
                    "role lists multiple parents; only the first is followed"
                );
            }
            RoleDefinition {
                parent: entry.inherits.into_iter().next().map(Role::new),
                grants: entry.can.into_iter().map(Grant::from).collect(),
                name: Role::new(name),
            }
        });

        Self::new(definitions)
    }

    pub fn get(&self, role: &str) -> Option<&RoleDefinition> {
        self.roles.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }

    /// Roles visited when resolving `role`, starting with `role` itself.
    ///
    /// Stops at a root, an unknown parent, or a role already visited.
    pub fn inheritance_chain(&self, role: &str) -> Vec<&RoleDefinition> {
        let mut chain: Vec<&RoleDefinition> = Vec::new();
        let mut current = self.roles.get(role);
        while let Some(def) = current {
            if chain.iter().any(|seen| seen.name == def.name) {
                break;
            }
            chain.push(def);
            current = def.parent.as_ref().and_then(|p| self.roles.get(p));
        }
        chain
    }

    /// Accumulated grants of `role` and all its ancestors.
    pub fn effective_grants(&self, role: &str) -> BTreeSet<&str> {
        self.inheritance_chain(role)
            .into_iter()
            .flat_map(|def| def.grants.iter().map(Grant::as_str))
            .collect()
    }

    /// Allow if `action` is granted outright, or `action:own` is granted and
    /// the requester owns the resource.
    pub fn evaluate(&self, role: &str, action: &str, owner_match: bool) -> bool {
        let grants = self.effective_grants(role);
        grants.contains(action) || (owner_match && grants.contains(Grant::own(action).as_str()))
    }

    /// Explain how `evaluate` reaches its answer, for audit endpoints and logs.
    pub fn explain(&self, role: &str, action: &str, owner_match: bool) -> PolicyExplanation {
        let chain = self.inheritance_chain(role);
        let grants = self.effective_grants(role);
        let own = Grant::own(action);

        let matched_grant = if grants.contains(action) {
            Some(action.to_string())
        } else if owner_match && grants.contains(own.as_str()) {
            Some(own.as_str().to_string())
        } else {
            None
        };

        let denial_reason = if matched_grant.is_some() {
            None
        } else if chain.is_empty() {
            Some(DenialReason {
                kind: DenialKind::UnknownRole,
                message: format!("role '{role}' is not defined in the local policy table"),
            })
        } else if grants.contains(own.as_str()) {
            Some(DenialReason {
                kind: DenialKind::OwnershipRequired,
                message: format!("role '{role}' may only '{action}' resources it owns"),
            })
        } else {
            Some(DenialReason {
                kind: DenialKind::MissingGrant,
                message: format!("role '{role}' has no grant for '{action}'"),
            })
        };

        PolicyExplanation {
            role: role.to_string(),
            action: action.to_string(),
            owner_match,
            granted: matched_grant.is_some(),
            matched_grant,
            inheritance_chain: chain.iter().map(|d| d.name.to_string()).collect(),
            effective_grants: grants.into_iter().map(str::to_string).collect(),
            denial_reason,
        }
    }
}

impl Default for LocalPolicyTable {
    fn default() -> Self {
        Self::with_default_roles()
    }
}

#[derive(Debug, Deserialize)]
struct RoleFileEntry {
    #[serde(default)]
    can: Vec<String>,
    #[serde(default)]
    inherits: Vec<String>,
}

/// Detailed explanation of a local policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyExplanation {
    pub role: String,
    pub action: String,
    pub owner_match: bool,
    pub granted: bool,
    /// The grant that allowed the action, if any.
    pub matched_grant: Option<String>,
    /// Roles visited, starting with the requested role.
    pub inheritance_chain: Vec<String>,
    /// Sorted accumulated grants.
    pub effective_grants: Vec<String>,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    UnknownRole,
    MissingGrant,
    OwnershipRequired,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> LocalPolicyTable {
        LocalPolicyTable::with_default_roles()
    }

    #[test]
    fn admin_inherits_everything() {
        let t = table();
        assert!(t.evaluate("admin", "delete", false));
        assert!(t.evaluate("admin", "read", false));
        assert_eq!(
            t.effective_grants("admin").into_iter().collect::<Vec<_>>(),
            vec!["create", "create:own", "delete", "read", "update", "update:own"]
        );
    }

    #[test]
    fn guest_cannot_create() {
        assert!(!table().evaluate("guest", "create", false));
        assert!(!table().evaluate("guest", "create", true));
    }

    #[test]
    fn user_update_requires_ownership() {
        let t = table();
        assert!(t.evaluate("user", "update", true));
        assert!(!t.evaluate("user", "update", false));
        assert!(!t.evaluate("user", "delete", true));
    }

    #[test]
    fn unknown_role_has_no_grants() {
        let t = table();
        assert!(t.effective_grants("auditor").is_empty());
        assert!(!t.evaluate("auditor", "read", true));
    }

    #[test]
    fn rejects_cycles() {
        let err = LocalPolicyTable::new(vec![
            RoleDefinition::new("a", ["read"]).inherits("b"),
            RoleDefinition::new("b", ["write"]).inherits("a"),
        ])
        .unwrap_err();
        assert!(matches!(err, PolicyTableError::Cycle(_)));
    }

    #[test]
    fn rejects_self_inheritance() {
        let err = LocalPolicyTable::new(vec![RoleDefinition::new("a", ["read"]).inherits("a")])
            .unwrap_err();
        assert_eq!(err, PolicyTableError::Cycle("a".to_string()));
    }

    #[test]
    fn rejects_unknown_parent_and_duplicates() {
        let err = LocalPolicyTable::new(vec![RoleDefinition::new("a", ["read"]).inherits("ghost")])
            .unwrap_err();
        assert_eq!(
            err,
            PolicyTableError::UnknownParent {
                role: "a".to_string(),
                parent: "ghost".to_string()
            }
        );

        let err = LocalPolicyTable::new(vec![
            RoleDefinition::new("a", ["read"]),
            RoleDefinition::new("a", ["write"]),
        ])
        .unwrap_err();
        assert_eq!(err, PolicyTableError::DuplicateRole("a".to_string()));
    }

    #[test]
    fn json_role_file_follows_first_parent_only() {
        let t = LocalPolicyTable::from_json_str(
            r#"{
                "editor": { "can": ["update"], "inherits": ["viewer", "commenter"] },
                "viewer": { "can": ["read"] },
                "commenter": { "can": ["comment"] }
            }"#,
        )
        .unwrap();

        assert_eq!(t.get("editor").unwrap().parent, Some(Role::new("viewer")));
        assert!(t.evaluate("editor", "read", false));
        assert!(!t.evaluate("editor", "comment", false));
    }

    #[test]
    fn json_role_file_reports_parse_errors() {
        let err = LocalPolicyTable::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, PolicyTableError::Parse(_)));
    }

    #[test]
    fn explain_reports_ownership_denial() {
        let e = table().explain("user", "update", false);
        assert!(!e.granted);
        assert_eq!(e.inheritance_chain, vec!["user", "guest"]);
        assert_eq!(e.denial_reason.unwrap().kind, DenialKind::OwnershipRequired);

        let e = table().explain("user", "update", true);
        assert!(e.granted);
        assert_eq!(e.matched_grant.as_deref(), Some("update:own"));
    }

    #[test]
    fn explain_reports_unknown_role() {
        let e = table().explain("nobody", "read", false);
        assert_eq!(e.denial_reason.unwrap().kind, DenialKind::UnknownRole);
    }

    const ACTIONS: [&str; 4] = ["read", "create", "update", "delete"];
    const GRANTS: [&str; 8] = [
        "read",
        "create",
        "update",
        "delete",
        "read:own",
        "create:own",
        "update:own",
        "delete:own",
    ];

    /// Chain `r0 -> r1 -> ... -> rN` with the given grants per level.
    fn chain_table(levels: &[BTreeSet<&'static str>]) -> LocalPolicyTable {
        let defs = levels.iter().enumerate().map(|(i, grants)| {
            let def = RoleDefinition::new(format!("r{i}"), grants.iter().copied());
            if i + 1 < levels.len() {
                def.inherits(format!("r{}", i + 1))
            } else {
                def
            }
        });
        LocalPolicyTable::new(defs).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: without ownership, a role is allowed exactly the actions in
        /// its accumulated grant set.
        #[test]
        fn evaluate_without_ownership_matches_accumulated_grants(
            levels in prop::collection::vec(
                prop::collection::btree_set(prop::sample::select(GRANTS.to_vec()), 0..5),
                1..5,
            ),
            action in prop::sample::select(ACTIONS.to_vec()),
        ) {
            let t = chain_table(&levels);
            for start in 0..levels.len() {
                let accumulated: BTreeSet<&str> = levels[start..].iter().flatten().copied().collect();
                prop_assert_eq!(
                    t.evaluate(&format!("r{start}"), action, false),
                    accumulated.contains(action)
                );
            }
        }

        /// Property: with ownership, `action:own` also suffices.
        #[test]
        fn evaluate_with_ownership_accepts_own_scoped_grants(
            levels in prop::collection::vec(
                prop::collection::btree_set(prop::sample::select(GRANTS.to_vec()), 0..5),
                1..5,
            ),
            action in prop::sample::select(ACTIONS.to_vec()),
        ) {
            let t = chain_table(&levels);
            let accumulated: BTreeSet<&str> = levels.iter().flatten().copied().collect();
            let own = format!("{action}:own");
            prop_assert_eq!(
                t.evaluate("r0", action, true),
                accumulated.contains(action) || accumulated.contains(own.as_str())
            );
        }
    }
}
