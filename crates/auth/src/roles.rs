use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings in tokens; [`Role::permissions`] is the built-in
/// policy mapping them to permissions within the member organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ORG_ADMIN: Role = Role(Cow::Borrowed("org_admin"));
    pub const ORG_USER: Role = Role(Cow::Borrowed("org_user"));
    pub const VIEWER: Role = Role(Cow::Borrowed("viewer"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Permissions granted by this role. Unknown roles grant nothing.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            "org_admin" => vec![Permission::WILDCARD],
            "org_user" => vec![
                Permission::ITEMS_READ,
                Permission::ITEMS_WRITE,
                Permission::PARTNERS_READ,
                Permission::PARTNERS_WRITE,
                Permission::PARTNERS_INVITE,
            ],
            "viewer" => vec![Permission::ITEMS_READ, Permission::PARTNERS_READ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
