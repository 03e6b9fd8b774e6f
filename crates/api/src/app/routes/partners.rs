use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use essentials_auth::Permission;
use essentials_infra::services::InviteOutcome;
use essentials_partners::PartnerId;

use super::guard;
use crate::app::dto::{self, paths};
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create).get(index))
        .route("/:id", get(show))
        .route("/:id/invite", post(invite))
}

pub async fn index(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::PARTNERS_READ)?;

    let partners = services
        .partners
        .list(organization_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(partners).into_response())
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
    payload: Result<Json<dto::PartnerParams>, JsonRejection>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::PARTNERS_WRITE)?;
    let params = dto::body(payload)?;

    let partner = services
        .partners
        .create(organization_id, &params.partner.name, &params.partner.email)
        .await
        .map_err(service_error_to_response)?;

    Ok(dto::redirect(
        paths::partner(organization_id, partner.id),
        format!("Partner {} added!", partner.name),
    ))
}

pub async fn show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::PARTNERS_READ)?;
    let partner_id: PartnerId = dto::parse_id(&id)?;

    let partner = services
        .partners
        .get(organization_id, partner_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(partner).into_response())
}

pub async fn invite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::PARTNERS_INVITE)?;
    let partner_id: PartnerId = dto::parse_id(&id)?;

    let outcome = services
        .invites
        .call(organization_id, partner_id)
        .await
        .map_err(service_error_to_response)?;

    let notice = match outcome {
        InviteOutcome::AlreadyInvited => "Partner has already been invited.",
        InviteOutcome::Invited { .. } => "Partner invited!",
    };
    Ok(dto::redirect(paths::partner(organization_id, partner_id), notice))
}
