use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "items.read").
/// A special wildcard permission `"*"` can be used by policy layers to indicate
/// "allow all" without hardcoding domain permissions into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const ITEMS_READ: Permission = Permission(Cow::Borrowed("items.read"));
    pub const ITEMS_WRITE: Permission = Permission(Cow::Borrowed("items.write"));
    pub const PARTNERS_READ: Permission = Permission(Cow::Borrowed("partners.read"));
    pub const PARTNERS_WRITE: Permission = Permission(Cow::Borrowed("partners.write"));
    pub const PARTNERS_INVITE: Permission = Permission(Cow::Borrowed("partners.invite"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
