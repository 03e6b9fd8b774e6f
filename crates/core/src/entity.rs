//! Entity trait: identity + continuity across state changes.

use crate::OrganizationId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity that lives inside exactly one organization (tenant).
pub trait OrganizationScoped: Entity {
    fn organization_id(&self) -> OrganizationId;

    /// Whether the record is visible to the given organization.
    fn belongs_to(&self, organization_id: OrganizationId) -> bool {
        self.organization_id() == organization_id
    }
}
