use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use essentials_core::OrganizationId;
use essentials_inventory::{Item, ItemCategory, ItemCategoryId};

use super::ServiceError;
use crate::store::{InventoryStore, ItemFilter, StoreError};

/// A category with its active items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDetail {
    pub category: ItemCategory,
    pub items: Vec<Item>,
}

pub struct ItemCategoryService {
    store: Arc<dyn InventoryStore>,
}

impl ItemCategoryService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        organization_id: OrganizationId,
        name: &str,
        description: Option<&str>,
    ) -> Result<ItemCategory, ServiceError> {
        let category = ItemCategory::create(ItemCategoryId::new(), organization_id, name, description, Utc::now())?;

        match self.store.insert_category(category.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(ServiceError::Validation("name has already been taken".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(organization_id = %organization_id, category_id = %category.id, name = %category.name, "item category created");
        Ok(category)
    }

    pub async fn show(
        &self,
        organization_id: OrganizationId,
        category_id: ItemCategoryId,
    ) -> Result<CategoryDetail, ServiceError> {
        let category = self
            .store
            .get_category(organization_id, category_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let filter = ItemFilter {
            category_id: Some(category.id),
            ..Default::default()
        };
        let items = self.store.list_items(organization_id, &filter).await?;
        Ok(CategoryDetail { category, items })
    }

    pub async fn list(&self, organization_id: OrganizationId) -> Result<Vec<ItemCategory>, ServiceError> {
        Ok(self.store.list_categories(organization_id).await?)
    }
}
