use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde_json::json;

use essentials_auth::Permission;
use essentials_inventory::{CentsInput, ItemAttributes, ItemId};

use super::guard;
use crate::app::dto::{self, paths};
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(index).post(create))
        .route("/new", get(new_form))
        .route("/:id", get(show).put(update).patch(update).delete(destroy))
        .route("/:id/edit", get(edit))
        .route("/:id/restore", patch(restore))
        .route("/:id/remove_category", patch(remove_category))
}

pub async fn index(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
    Query(query): Query<dto::ItemIndexQuery>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_READ)?;
    let filter = query.to_filter()?;

    let items = services
        .items
        .index(organization_id, &filter)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(json!({
        "status": filter.status.status().map(|s| s.as_str()).unwrap_or("all"),
        "items": items,
    }))
    .into_response())
}

pub async fn new_form(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;

    let options = services
        .items
        .form_options(organization_id)
        .await
        .map_err(service_error_to_response)?;
    let defaults = ItemAttributes {
        value_in_cents: Some(CentsInput::Amount(0)),
        visible_to_partners: Some(true),
        ..Default::default()
    };

    Ok(Json(json!({
        "item": defaults,
        "base_items": options.base_items,
        "categories": options.categories,
    }))
    .into_response())
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(organization_id): Path<String>,
    payload: Result<Json<dto::ItemParams>, JsonRejection>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let params = dto::body(payload)?;

    let item = services
        .items
        .create(organization_id, &params.item)
        .await
        .map_err(service_error_to_response)?;

    Ok(dto::redirect(paths::items(organization_id), format!("{} added!", item.name)))
}

pub async fn show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_READ)?;
    let item_id: ItemId = dto::parse_id(&id)?;

    let item = services
        .items
        .show(organization_id, item_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(item).into_response())
}

pub async fn edit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let item_id: ItemId = dto::parse_id(&id)?;

    let item = services
        .items
        .edit(organization_id, item_id)
        .await
        .map_err(service_error_to_response)?;
    let options = services
        .items
        .form_options(organization_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(json!({
        "item": item,
        "base_items": options.base_items,
        "categories": options.categories,
    }))
    .into_response())
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
    payload: Result<Json<dto::ItemParams>, JsonRejection>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let item_id: ItemId = dto::parse_id(&id)?;
    let params = dto::body(payload)?;

    let item = services
        .items
        .update(organization_id, item_id, &params.item)
        .await
        .map_err(service_error_to_response)?;

    Ok(dto::redirect(paths::items(organization_id), format!("{} updated!", item.name)))
}

pub async fn destroy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let item_id: ItemId = dto::parse_id(&id)?;

    let transition = services
        .items
        .destroy(organization_id, item_id)
        .await
        .map_err(service_error_to_response)?;

    let notice = if transition.applied() {
        "Item has been removed."
    } else {
        "Item was already removed."
    };
    Ok(dto::redirect(paths::items(organization_id), notice))
}

pub async fn restore(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let item_id: ItemId = dto::parse_id(&id)?;

    let transition = services
        .items
        .restore(organization_id, item_id)
        .await
        .map_err(service_error_to_response)?;

    let notice = if transition.applied() {
        "Item has been restored."
    } else {
        "Nothing to restore."
    };
    Ok(dto::redirect(paths::items(organization_id), notice))
}

pub async fn remove_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((organization_id, id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let organization_id = guard(&principal, &organization_id, &Permission::ITEMS_WRITE)?;
    let item_id: ItemId = dto::parse_id(&id)?;

    let previous = services
        .items
        .remove_category(organization_id, item_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(match previous {
        Some(category_id) => dto::redirect(
            paths::item_category(organization_id, category_id),
            "Item has been removed from the category.",
        ),
        None => dto::redirect(paths::items(organization_id), "Item had no category."),
    })
}
