use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Grant held by a role.
///
/// Grants are either a bare action (`"update"`), which permits the action on
/// any resource, or an ownership-scoped action (`"update:own"`), which
/// permits it only when the requester owns the resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grant(Cow<'static, str>);

impl Grant {
    pub const OWN_SUFFIX: &'static str = ":own";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Ownership-scoped grant for `action` (`"<action>:own"`).
    pub fn own(action: &str) -> Self {
        Self(Cow::Owned(format!("{action}{}", Self::OWN_SUFFIX)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl From<&'static str> for Grant {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Grant {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl core::fmt::Display for Grant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_scoped_grant_carries_suffix() {
        let g = Grant::own("update");
        assert_eq!(g.as_str(), "update:own");
        assert_eq!(g, Grant::from("update:own".to_string()));
    }

    #[test]
    fn grants_serialize_as_plain_strings() {
        let grants: Vec<Grant> = serde_json::from_str(r#"["delete", "read:own"]"#).unwrap();
        assert_eq!(grants, vec![Grant::from("delete"), Grant::own("read")]);
        assert_eq!(serde_json::to_string(&grants[1]).unwrap(), r#""read:own""#);
    }
}
