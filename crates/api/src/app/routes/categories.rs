use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use essentials_auth::Permission;
use essentials_inventory::ItemCategoryId;

use super::guard;
use crate::app::dto::{self, paths};
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create).get(index))
        .route("/:id", get(show))
}

pub async fn index(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_READ)?;

    let categories = services
        .categories
        .list(organization_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(categories).into_response())
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
    payload: Result<Json<dto::ItemCategoryParams>, JsonRejection>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let params = dto::body(payload)?;

    let category = services
        .categories
        .create(
            organization_id,
            &params.item_category.name,
            params.item_category.description.as_deref(),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(dto::redirect(
        paths::item_category(organization_id, category.id),
        format!("{} added!", category.name),
    ))
}

pub async fn show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_READ)?;
    let category_id: ItemCategoryId = dto::parse_id(&id)?;

    let detail = services
        .categories
        .show(organization_id, category_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(detail).into_response())
}
