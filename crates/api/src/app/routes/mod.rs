use axum::{Router, routing::get};

pub mod categories;
pub mod items;
pub mod kits;
pub mod partners;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    let organization = Router::new()
        .nest("/items", items::router())
        .nest("/kits", kits::router())
        .nest("/item_categories", categories::router())
        .nest("/partners", partners::router());

    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/organizations/:organization_id", organization)
}

/// Parse the path organization and authorize the principal inside it.
pub(crate) fn guard(
    principal: &crate::context::PrincipalContext,
    raw_organization_id: &str,
    permission: &essentials_auth::Permission,
) -> Result<essentials_core::OrganizationId, axum::response::Response> {
    let organization_id = crate::app::dto::parse_id(raw_organization_id)?;
    crate::authz::authorize_request(principal, organization_id, permission)?;
    Ok(organization_id)
}
