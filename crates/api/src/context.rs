use essentials_auth::{JwtClaims, OrganizationMembership, Principal, PrincipalId, Role};
use essentials_core::OrganizationId;

/// Authenticated principal for a request, built from verified token claims.
///
/// The organization here is the one the principal belongs to; the organization
/// a request targets comes from the path and is checked in [`crate::authz`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn from_claims(claims: JwtClaims) -> Self {
        Self {
            principal: Principal {
                principal_id: claims.sub,
                membership: OrganizationMembership::from_roles(claims.organization_id, claims.roles),
            },
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal.principal_id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.principal.organization_id()
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.membership.roles
    }
}
