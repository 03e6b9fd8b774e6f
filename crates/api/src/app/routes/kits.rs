use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use essentials_auth::Permission;
use essentials_inventory::KitId;

use super::guard;
use crate::app::dto::{self, paths};
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create))
        .route("/:id", get(show).patch(rename))
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
    payload: Result<Json<dto::KitParams>, JsonRejection>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let params = dto::body(payload)?;
    let value = params.kit.value()?;

    let (kit, _) = services
        .kits
        .create_kit(
            organization_id,
            &params.kit.name,
            value,
            params.kit.visible_to_partners.unwrap_or(true),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(dto::redirect(paths::kit(organization_id, kit.id), format!("{} created!", kit.name)))
}

pub async fn show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_READ)?;
    let kit_id: KitId = dto::parse_id(&id)?;

    let detail = services
        .kits
        .get_kit(organization_id, kit_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(detail).into_response())
}

pub async fn rename(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
    payload: Result<Json<dto::KitRenameParams>, JsonRejection>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let kit_id: KitId = dto::parse_id(&id)?;
    let params = dto::body(payload)?;

    let (kit, _) = services
        .kits
        .rename_kit(organization_id, kit_id, &params.kit.name)
        .await
        .map_err(service_error_to_response)?;

    Ok(dto::redirect(paths::kit(organization_id, kit.id), format!("{} updated!", kit.name)))
}
