//! Request-level authorization guard.
//!
//! Every organization-scoped handler calls [`authorize_request`] before it
//! touches a service, so denied requests never reach the stores.

use axum::response::Response;

use essentials_auth::{Permission, authorize};
use essentials_core::OrganizationId;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the principal may use `permission` inside `organization_id`.
pub fn authorize_request(
    principal: &PrincipalContext,
    organization_id: OrganizationId,
    permission: &Permission,
) -> Result<(), Response> {
    authorize(principal.principal(), organization_id, permission).map_err(errors::authz_error_to_response)
}
