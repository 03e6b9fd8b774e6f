//! Application services (managers) that orchestrate domain logic over the stores.
//!
//! ```text
//! request (already authorized for an organization)
//!   ↓
//! 1. Load records scoped to the organization
//!   ↓
//! 2. Apply domain rules (pure, from the domain crates)
//!   ↓
//! 3. Persist through one store call (the unit of atomicity)
//!   ↓
//! 4. Call external collaborators (identity provider), only after local checks pass
//! ```
//!
//! Every service returns [`ServiceError`], which folds domain, store and
//! identity errors into one taxonomy for the API layer.

use essentials_core::DomainError;

use crate::identity::IdentityError;
use crate::store::StoreError;

pub mod categories;
pub mod items;
pub mod kits;
pub mod partner_invite;
pub mod partners;

pub use categories::{CategoryDetail, ItemCategoryService};
pub use items::{ItemFormOptions, ItemLifecycleManager};
pub use kits::{KitDetail, KitManager};
pub use partner_invite::{InviteOutcome, PartnerInviteService};
pub use partners::PartnerDirectory;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Rejected input; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Operation not allowed from the record's current state.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,
    /// A collaborator outside this system failed.
    #[error("external service failure: {0}")]
    ExternalService(String),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::Unauthorized => ServiceError::Unauthorized,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            // Never confirm that another organization's record exists.
            StoreError::OrganizationIsolation => ServiceError::NotFound,
            StoreError::Duplicate(msg) => ServiceError::Conflict(msg),
            StoreError::NameTaken(_) => ServiceError::Validation("name has already been taken".to_string()),
            other => ServiceError::Store(other),
        }
    }
}

impl From<IdentityError> for ServiceError {
    fn from(value: IdentityError) -> Self {
        match value {
            IdentityError::Store(e) => e.into(),
            other => ServiceError::ExternalService(other.to_string()),
        }
    }
}

/// Result of a guarded state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Preconditions did not hold; nothing changed.
    Unchanged,
}

impl Transition {
    pub fn applied(self) -> bool {
        self == Transition::Applied
    }
}

impl From<bool> for Transition {
    fn from(changed: bool) -> Self {
        if changed {
            Transition::Applied
        } else {
            Transition::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_violations_surface_as_not_found() {
        assert!(matches!(
            ServiceError::from(StoreError::OrganizationIsolation),
            ServiceError::NotFound
        ));
    }

    #[test]
    fn identity_failures_are_external() {
        let err = ServiceError::from(IdentityError::Api(500, "boom".into()));
        assert!(matches!(err, ServiceError::ExternalService(_)));

        let err = ServiceError::from(IdentityError::Store(StoreError::NotFound));
        assert!(matches!(err, ServiceError::NotFound));
    }
}
