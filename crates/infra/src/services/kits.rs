use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use essentials_core::{Cents, OrganizationId};
use essentials_inventory::{BaseItem, Item, ItemId, Kit, KitId};

use super::ServiceError;
use super::items::ensure_base_item;
use crate::store::{InventoryStore, ItemFilter, StatusFilter};

/// A kit with every item linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitDetail {
    pub kit: Kit,
    pub items: Vec<Item>,
}

pub struct KitManager {
    store: Arc<dyn InventoryStore>,
}

impl KitManager {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Create a kit and the item that represents it, in one store call.
    pub async fn create_kit(
        &self,
        organization_id: OrganizationId,
        name: &str,
        value_in_cents: Cents,
        visible_to_partners: bool,
    ) -> Result<(Kit, Item), ServiceError> {
        let kit = Kit::create(KitId::new(), organization_id, name, value_in_cents, visible_to_partners, Utc::now())?;

        ensure_base_item(self.store.as_ref(), BaseItem::KIT_PARTNER_KEY).await?;

        let item = Item::for_kit(ItemId::new(), &kit, BaseItem::KIT_PARTNER_KEY);
        self.store.insert_kit(kit.clone(), item.clone()).await?;

        info!(organization_id = %organization_id, kit_id = %kit.id, name = %kit.name, "kit created");
        Ok((kit, item))
    }

    /// Rename a kit and every linked item. Returns the kit and the number of
    /// items renamed (zero when the name did not change).
    pub async fn rename_kit(
        &self,
        organization_id: OrganizationId,
        kit_id: KitId,
        name: &str,
    ) -> Result<(Kit, usize), ServiceError> {
        let mut kit = self
            .store
            .get_kit(organization_id, kit_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if !kit.rename(name, Utc::now())? {
            return Ok((kit, 0));
        }
        let renamed = self.store.rename_kit(&kit, None).await?;
        info!(organization_id = %organization_id, kit_id = %kit.id, name = %kit.name, items = renamed, "kit renamed");
        Ok((kit, renamed))
    }

    pub async fn get_kit(&self, organization_id: OrganizationId, kit_id: KitId) -> Result<KitDetail, ServiceError> {
        let kit = self
            .store
            .get_kit(organization_id, kit_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let filter = ItemFilter {
            status: StatusFilter::All,
            kit_id: Some(kit.id),
            ..Default::default()
        };
        let items = self.store.list_items(organization_id, &filter).await?;
        Ok(KitDetail { kit, items })
    }
}
