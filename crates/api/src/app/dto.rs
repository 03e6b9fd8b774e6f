use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use essentials_core::Cents;
use essentials_infra::store::{ItemFilter, StatusFilter};
use essentials_inventory::{CentsInput, ItemAttributes, ItemCategoryId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemParams {
    pub item: ItemAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemIndexQuery {
    pub status: Option<String>,
    pub category_id: Option<String>,
}

impl ItemIndexQuery {
    pub fn to_filter(&self) -> Result<ItemFilter, Response> {
        let status = match self.status.as_deref() {
            None | Some("") => StatusFilter::default(),
            Some(s) => StatusFilter::parse(s).map_err(|e| errors::validation_error(e.to_string()))?,
        };
        let category_id = match self.category_id.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                ItemCategoryId::from_str(raw).map_err(|e| errors::validation_error(e.to_string()))?,
            ),
        };
        Ok(ItemFilter {
            status,
            category_id,
            kit_id: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KitAttributes {
    pub name: String,
    #[serde(default)]
    pub value_in_cents: Option<CentsInput>,
    #[serde(default)]
    pub visible_to_partners: Option<bool>,
}

impl KitAttributes {
    pub fn value(&self) -> Result<Cents, Response> {
        self.value_in_cents
            .as_ref()
            .map(CentsInput::to_cents)
            .transpose()
            .map(|v| v.unwrap_or(Cents::ZERO))
            .map_err(|e| errors::validation_error(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KitParams {
    pub kit: KitAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KitRename {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KitRenameParams {
    pub kit: KitRename,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemCategoryAttributes {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemCategoryParams {
    pub item_category: ItemCategoryAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartnerAttributes {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartnerParams {
    pub partner: PartnerAttributes,
}

// -------------------------
// Extraction helpers
// -------------------------

/// Unwrap a JSON body; any decoding failure (including unknown keys) is a 422.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(errors::validation_error(rejection.body_text())),
    }
}

/// Parse a path id. Malformed ids are reported like unknown ones.
pub fn parse_id<T: FromStr>(raw: &str) -> Result<T, Response> {
    raw.parse().map_err(|_| errors::not_found())
}

// -------------------------
// Responses
// -------------------------

/// `303 See Other` with a `Location` header and a JSON notice.
pub fn redirect(location: String, notice: impl Into<String>) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.clone())],
        Json(json!({
            "notice": notice.into(),
            "location": location,
        })),
    )
        .into_response()
}

pub mod paths {
    use std::fmt::Display;

    use essentials_core::OrganizationId;

    pub fn items(organization_id: OrganizationId) -> String {
        format!("/organizations/{organization_id}/items")
    }

    pub fn item_category(organization_id: OrganizationId, id: impl Display) -> String {
        format!("/organizations/{organization_id}/item_categories/{id}")
    }

    pub fn kit(organization_id: OrganizationId, id: impl Display) -> String {
        format!("/organizations/{organization_id}/kits/{id}")
    }

    pub fn partner(organization_id: OrganizationId, id: impl Display) -> String {
        format!("/organizations/{organization_id}/partners/{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essentials_core::OrganizationId;

    #[test]
    fn item_params_reject_unknown_keys() {
        assert!(serde_json::from_value::<ItemParams>(json!({ "item": { "bad": "params" } })).is_err());
        assert!(serde_json::from_value::<ItemParams>(json!({ "bad": "params" })).is_err());

        let ok: ItemParams = serde_json::from_value(json!({
            "item": { "name": "Wipes", "value_in_cents": "$5,432.10" }
        }))
        .unwrap();
        assert_eq!(ok.item.value_in_cents, Some(CentsInput::Formatted("$5,432.10".into())));
    }

    #[test]
    fn index_query_defaults_to_active() {
        let filter = ItemIndexQuery::default().to_filter().unwrap();
        assert_eq!(filter.status, StatusFilter::Active);

        let q = ItemIndexQuery {
            status: Some("all".into()),
            category_id: None,
        };
        assert_eq!(q.to_filter().unwrap().status, StatusFilter::All);

        let bad = ItemIndexQuery {
            status: Some("deleted".into()),
            category_id: None,
        };
        assert_eq!(bad.to_filter().unwrap_err().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn redirect_sets_location() {
        let org = OrganizationId::new();
        let resp = redirect(paths::items(org), "Item was created");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
            format!("/organizations/{org}/items")
        );
    }
}
