use std::collections::HashSet;

use thiserror::Error;

use essentials_core::OrganizationId;

use crate::{OrganizationMembership, Permission, PrincipalId};

/// A fully resolved principal for authorization decisions.
///
/// Construction of this object is decoupled from storage and transport: the API
/// derives it from verified token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub membership: OrganizationMembership,
}

impl Principal {
    pub fn organization_id(&self) -> OrganizationId {
        self.membership.organization_id
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("organization mismatch")]
    OrganizationMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal against a target organization.
///
/// Cross-organization access is rejected before any permission is considered.
/// No IO, no panics.
pub fn authorize(
    principal: &Principal,
    target: OrganizationId,
    required: &Permission,
) -> Result<(), AuthzError> {
    if principal.organization_id() != target {
        tracing::warn!(
            principal_id = %principal.principal_id,
            member_of = %principal.organization_id(),
            target = %target,
            "cross-organization access denied"
        );
        return Err(AuthzError::OrganizationMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn principal(org: OrganizationId, roles: Vec<Role>) -> Principal {
        Principal {
            principal_id: PrincipalId::new(),
            membership: OrganizationMembership::from_roles(org, roles),
        }
    }

    #[test]
    fn admin_is_allowed_everything_in_own_organization() {
        let org = OrganizationId::new();
        let p = principal(org, vec![Role::ORG_ADMIN]);
        assert!(authorize(&p, org, &Permission::PARTNERS_INVITE).is_ok());
        assert!(authorize(&p, org, &Permission::ITEMS_WRITE).is_ok());
    }

    #[test]
    fn other_organization_is_rejected_even_for_admin() {
        let p = principal(OrganizationId::new(), vec![Role::ORG_ADMIN]);
        assert_eq!(
            authorize(&p, OrganizationId::new(), &Permission::ITEMS_READ),
            Err(AuthzError::OrganizationMismatch)
        );
    }

    #[test]
    fn viewer_cannot_write() {
        let org = OrganizationId::new();
        let p = principal(org, vec![Role::VIEWER]);
        assert!(authorize(&p, org, &Permission::ITEMS_READ).is_ok());
        assert_eq!(
            authorize(&p, org, &Permission::ITEMS_WRITE),
            Err(AuthzError::Forbidden("items.write".to_string()))
        );
    }

    #[test]
    fn unknown_role_grants_nothing() {
        let org = OrganizationId::new();
        let p = principal(org, vec![Role::new("partner")]);
        assert!(authorize(&p, org, &Permission::ITEMS_READ).is_err());
    }
}
