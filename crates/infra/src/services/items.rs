//! Item lifecycle: create, update (with kit-name propagation), soft delete,
//! restore and category removal, all scoped to one organization.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use essentials_core::OrganizationId;
use essentials_inventory::{BaseItem, Item, ItemAttributes, ItemCategory, ItemCategoryId, ItemId};

use super::{ServiceError, Transition};
use crate::store::{InventoryStore, ItemFilter, StatusFilter};

/// Choices offered by the item create/edit forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFormOptions {
    pub base_items: Vec<BaseItem>,
    pub categories: Vec<ItemCategory>,
}

pub struct ItemLifecycleManager {
    store: Arc<dyn InventoryStore>,
}

impl ItemLifecycleManager {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, organization_id: OrganizationId, attrs: &ItemAttributes) -> Result<Item, ServiceError> {
        let item = Item::create(ItemId::new(), organization_id, attrs, Utc::now())?;

        ensure_base_item(self.store.as_ref(), &item.partner_key).await?;
        ensure_category(self.store.as_ref(), organization_id, item.item_category_id).await?;

        self.store.insert_item(item.clone()).await?;
        info!(organization_id = %organization_id, item_id = %item.id, name = %item.name, "item created");
        Ok(item)
    }

    /// Apply attributes to an item. A name change on a kit-linked item renames
    /// the kit and every sibling item in the same store call.
    pub async fn update(
        &self,
        organization_id: OrganizationId,
        item_id: ItemId,
        attrs: &ItemAttributes,
    ) -> Result<Item, ServiceError> {
        let now = Utc::now();
        let mut item = self.load(organization_id, item_id).await?;
        let previous_partner_key = item.partner_key.clone();
        let change = item.apply_update(attrs, now)?;

        if item.partner_key != previous_partner_key {
            ensure_base_item(self.store.as_ref(), &item.partner_key).await?;
        }
        if attrs.item_category_id.is_some() {
            ensure_category(self.store.as_ref(), organization_id, item.item_category_id).await?;
        }

        let kit = match (change.name_changed, item.kit_id) {
            (true, Some(kit_id)) => {
                let kit = self.store.get_kit(organization_id, kit_id).await?;
                if kit.is_none() {
                    warn!(item_id = %item.id, kit_id = %kit_id, "item links to a missing kit");
                }
                kit
            }
            _ => None,
        };

        match kit {
            Some(mut kit) => {
                kit.rename(&item.name, now)?;
                let renamed = self.store.rename_kit(&kit, Some(&item)).await?;
                info!(
                    organization_id = %organization_id,
                    kit_id = %kit.id,
                    from = %change.previous_name,
                    to = %kit.name,
                    items = renamed,
                    "kit renamed through item"
                );
            }
            None => {
                self.store.save_item(&item).await?;
                info!(organization_id = %organization_id, item_id = %item.id, "item updated");
            }
        }

        Ok(item)
    }

    /// An active item of the organization.
    pub async fn show(&self, organization_id: OrganizationId, item_id: ItemId) -> Result<Item, ServiceError> {
        let item = self.load(organization_id, item_id).await?;
        if !item.is_active() {
            return Err(ServiceError::NotFound);
        }
        Ok(item)
    }

    /// An item of the organization in any status, for the edit form.
    pub async fn edit(&self, organization_id: OrganizationId, item_id: ItemId) -> Result<Item, ServiceError> {
        self.load(organization_id, item_id).await
    }

    pub async fn index(&self, organization_id: OrganizationId, filter: &ItemFilter) -> Result<Vec<Item>, ServiceError> {
        Ok(self.store.list_items(organization_id, filter).await?)
    }

    /// Soft delete. Destroying an inactive item changes nothing.
    pub async fn destroy(&self, organization_id: OrganizationId, item_id: ItemId) -> Result<Transition, ServiceError> {
        let mut item = self.load(organization_id, item_id).await?;
        if !item.deactivate(Utc::now()) {
            return Ok(Transition::Unchanged);
        }
        self.store.save_item(&item).await?;
        info!(organization_id = %organization_id, item_id = %item.id, "item deactivated");
        Ok(Transition::Applied)
    }

    /// Reactivate an inactive item of this organization. Anything else
    /// (active item, unknown id, another organization's item) is a no-op.
    pub async fn restore(&self, organization_id: OrganizationId, item_id: ItemId) -> Result<Transition, ServiceError> {
        let Some(mut item) = self.store.get_item(organization_id, item_id).await? else {
            warn!(organization_id = %organization_id, item_id = %item_id, "restore of unknown item ignored");
            return Ok(Transition::Unchanged);
        };
        if !item.reactivate(Utc::now()) {
            return Ok(Transition::Unchanged);
        }
        self.store.save_item(&item).await?;
        info!(organization_id = %organization_id, item_id = %item.id, "item restored");
        Ok(Transition::Applied)
    }

    /// Clear the item's category. Returns the category it was linked to.
    pub async fn remove_category(
        &self,
        organization_id: OrganizationId,
        item_id: ItemId,
    ) -> Result<Option<ItemCategoryId>, ServiceError> {
        let mut item = self.load(organization_id, item_id).await?;
        let previous = item.remove_category(Utc::now());
        if let Some(category_id) = previous {
            self.store.save_item(&item).await?;
            info!(
                organization_id = %organization_id,
                item_id = %item.id,
                category_id = %category_id,
                "item category removed"
            );
        }
        Ok(previous)
    }

    pub async fn count_active(&self, organization_id: OrganizationId) -> Result<usize, ServiceError> {
        Ok(self.store.count_items(organization_id, StatusFilter::Active).await?)
    }

    pub async fn form_options(&self, organization_id: OrganizationId) -> Result<ItemFormOptions, ServiceError> {
        Ok(ItemFormOptions {
            base_items: self.store.list_base_items().await?,
            categories: self.store.list_categories(organization_id).await?,
        })
    }

    async fn load(&self, organization_id: OrganizationId, item_id: ItemId) -> Result<Item, ServiceError> {
        self.store
            .get_item(organization_id, item_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }
}

pub(crate) async fn ensure_base_item(store: &dyn InventoryStore, partner_key: &str) -> Result<(), ServiceError> {
    if store.base_item(partner_key).await?.is_none() {
        return Err(ServiceError::Validation(format!(
            "partner_key '{partner_key}' does not match a base item"
        )));
    }
    Ok(())
}

async fn ensure_category(
    store: &dyn InventoryStore,
    organization_id: OrganizationId,
    category_id: Option<ItemCategoryId>,
) -> Result<(), ServiceError> {
    if let Some(id) = category_id {
        if store.get_category(organization_id, id).await?.is_none() {
            return Err(ServiceError::Validation("item_category_id does not match a category".to_string()));
        }
    }
    Ok(())
}
