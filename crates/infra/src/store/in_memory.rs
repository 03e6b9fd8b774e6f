//! In-memory stores for tests/dev.
//!
//! Each store keeps all of its tables behind one `RwLock`, so every trait call
//! observes and applies a consistent snapshot.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use essentials_core::{OrganizationId, OrganizationScoped, UserId};
use essentials_inventory::{BaseItem, Item, ItemCategory, ItemCategoryId, ItemId, Kit, KitId};
use essentials_partners::{Partner, PartnerId, PartnerUser};

use super::{InventoryStore, ItemFilter, PartnerStore, StatusFilter, StoreError};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Storage("store lock poisoned".to_string())
}

#[derive(Debug, Default)]
struct InventoryTables {
    base_items: HashMap<String, BaseItem>,
    items: HashMap<ItemId, Item>,
    kits: HashMap<KitId, Kit>,
    categories: HashMap<ItemCategoryId, ItemCategory>,
}

/// In-memory inventory store.
#[derive(Debug)]
pub struct InMemoryInventoryStore {
    inner: RwLock<InventoryTables>,
}

impl InMemoryInventoryStore {
    /// Empty store with the default base item catalogue.
    pub fn new() -> Self {
        Self::with_base_items(BaseItem::seed_catalog())
    }

    pub fn with_base_items(base_items: Vec<BaseItem>) -> Self {
        let tables = InventoryTables {
            base_items: base_items
                .into_iter()
                .map(|b| (b.partner_key.clone(), b))
                .collect(),
            ..Default::default()
        };
        Self {
            inner: RwLock::new(tables),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, InventoryTables>, StoreError> {
        self.inner.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, InventoryTables>, StoreError> {
        self.inner.write().map_err(poisoned)
    }
}

impl Default for InMemoryInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by_name<T>(mut rows: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    rows.sort_by(|a, b| name(a).to_lowercase().cmp(&name(b).to_lowercase()));
    rows
}

fn name_taken(
    items: &HashMap<ItemId, Item>,
    organization_id: OrganizationId,
    name: &str,
    item_id: Option<ItemId>,
    kit_id: Option<KitId>,
) -> Result<(), StoreError> {
    let clash = items.values().any(|other| {
        other.organization_id == organization_id
            && other.name == name
            && Some(other.id) != item_id
            && (kit_id.is_none() || other.kit_id != kit_id)
    });
    if clash {
        return Err(StoreError::NameTaken(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn base_item(&self, partner_key: &str) -> Result<Option<BaseItem>, StoreError> {
        Ok(self.read()?.base_items.get(partner_key).cloned())
    }

    async fn list_base_items(&self) -> Result<Vec<BaseItem>, StoreError> {
        let rows = self.read()?.base_items.values().cloned().collect();
        Ok(sorted_by_name(rows, |b: &BaseItem| b.name.as_str()))
    }

    async fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.items.contains_key(&item.id) {
            return Err(StoreError::Duplicate(format!("item {}", item.id)));
        }
        name_taken(&tables.items, item.organization_id, &item.name, Some(item.id), item.kit_id)?;
        tables.items.insert(item.id, item);
        Ok(())
    }

    async fn get_item(&self, organization_id: OrganizationId, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self
            .read()?
            .items
            .get(&id)
            .filter(|i| i.belongs_to(organization_id))
            .cloned())
    }

    async fn save_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        match tables.items.get(&item.id) {
            Some(existing) if existing.organization_id != item.organization_id => {
                return Err(StoreError::OrganizationIsolation);
            }
            Some(_) => {}
            None => return Err(StoreError::NotFound),
        }
        name_taken(&tables.items, item.organization_id, &item.name, Some(item.id), item.kit_id)?;
        tables.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn list_items(&self, organization_id: OrganizationId, filter: &ItemFilter) -> Result<Vec<Item>, StoreError> {
        let rows = self
            .read()?
            .items
            .values()
            .filter(|i| i.organization_id == organization_id && filter.matches(i))
            .cloned()
            .collect();
        Ok(sorted_by_name(rows, |i: &Item| i.name.as_str()))
    }

    async fn count_items(&self, organization_id: OrganizationId, status: StatusFilter) -> Result<usize, StoreError> {
        Ok(self
            .read()?
            .items
            .values()
            .filter(|i| i.organization_id == organization_id && status.matches(i.status))
            .count())
    }

    async fn insert_kit(&self, kit: Kit, kit_item: Item) -> Result<(), StoreError> {
        if kit_item.kit_id != Some(kit.id) || kit_item.organization_id != kit.organization_id {
            return Err(StoreError::OrganizationIsolation);
        }
        let mut tables = self.write()?;
        if tables.kits.contains_key(&kit.id) {
            return Err(StoreError::Duplicate(format!("kit {}", kit.id)));
        }
        if tables.items.contains_key(&kit_item.id) {
            return Err(StoreError::Duplicate(format!("item {}", kit_item.id)));
        }
        name_taken(&tables.items, kit.organization_id, &kit_item.name, Some(kit_item.id), Some(kit.id))?;
        tables.items.insert(kit_item.id, kit_item);
        tables.kits.insert(kit.id, kit);
        Ok(())
    }

    async fn get_kit(&self, organization_id: OrganizationId, id: KitId) -> Result<Option<Kit>, StoreError> {
        Ok(self
            .read()?
            .kits
            .get(&id)
            .filter(|k| k.belongs_to(organization_id))
            .cloned())
    }

    async fn rename_kit(&self, kit: &Kit, pending_item: Option<&Item>) -> Result<usize, StoreError> {
        let mut tables = self.write()?;

        match tables.kits.get(&kit.id) {
            Some(existing) if existing.organization_id != kit.organization_id => {
                return Err(StoreError::OrganizationIsolation);
            }
            Some(_) => {}
            None => return Err(StoreError::NotFound),
        }
        if let Some(item) = pending_item {
            match tables.items.get(&item.id) {
                Some(existing) if existing.organization_id != kit.organization_id => {
                    return Err(StoreError::OrganizationIsolation);
                }
                Some(_) => {}
                None => return Err(StoreError::NotFound),
            }
        }

        name_taken(&tables.items, kit.organization_id, &kit.name, None, Some(kit.id))?;

        // All checks passed; apply every change under the same guard.
        if let Some(item) = pending_item {
            tables.items.insert(item.id, item.clone());
        }
        tables.kits.insert(kit.id, kit.clone());

        let mut renamed = 0;
        for item in tables.items.values_mut() {
            if item.kit_id == Some(kit.id) && item.organization_id == kit.organization_id {
                item.name = kit.name.clone();
                item.updated_at = kit.updated_at;
                renamed += 1;
            }
        }
        Ok(renamed)
    }

    async fn insert_category(&self, category: ItemCategory) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let taken = tables
            .categories
            .values()
            .any(|c| c.organization_id == category.organization_id && c.name == category.name);
        if taken || tables.categories.contains_key(&category.id) {
            return Err(StoreError::Duplicate(format!("item category '{}'", category.name)));
        }
        tables.categories.insert(category.id, category);
        Ok(())
    }

    async fn get_category(
        &self,
        organization_id: OrganizationId,
        id: ItemCategoryId,
    ) -> Result<Option<ItemCategory>, StoreError> {
        Ok(self
            .read()?
            .categories
            .get(&id)
            .filter(|c| c.belongs_to(organization_id))
            .cloned())
    }

    async fn list_categories(&self, organization_id: OrganizationId) -> Result<Vec<ItemCategory>, StoreError> {
        let rows = self
            .read()?
            .categories
            .values()
            .filter(|c| c.belongs_to(organization_id))
            .cloned()
            .collect();
        Ok(sorted_by_name(rows, |c: &ItemCategory| c.name.as_str()))
    }
}

#[derive(Debug, Default)]
struct PartnerTables {
    partners: HashMap<PartnerId, Partner>,
    users: HashMap<UserId, PartnerUser>,
}

/// In-memory partner store.
#[derive(Debug, Default)]
pub struct InMemoryPartnerStore {
    inner: RwLock<PartnerTables>,
}

impl InMemoryPartnerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PartnerTables>, StoreError> {
        self.inner.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PartnerTables>, StoreError> {
        self.inner.write().map_err(poisoned)
    }
}

#[async_trait]
impl PartnerStore for InMemoryPartnerStore {
    async fn insert_partner(&self, partner: Partner) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.partners.contains_key(&partner.id) {
            return Err(StoreError::Duplicate(format!("partner {}", partner.id)));
        }
        tables.partners.insert(partner.id, partner);
        Ok(())
    }

    async fn get_partner(&self, organization_id: OrganizationId, id: PartnerId) -> Result<Option<Partner>, StoreError> {
        Ok(self
            .read()?
            .partners
            .get(&id)
            .filter(|p| p.belongs_to(organization_id))
            .cloned())
    }

    async fn save_partner(&self, partner: &Partner) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        match tables.partners.get_mut(&partner.id) {
            Some(existing) if existing.organization_id != partner.organization_id => {
                Err(StoreError::OrganizationIsolation)
            }
            Some(existing) => {
                *existing = partner.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn mark_invited(&self, partner: &Partner) -> Result<bool, StoreError> {
        if !partner.has_primary_user() {
            return Err(StoreError::Storage("mark_invited requires a primary user".to_string()));
        }
        let mut tables = self.write()?;
        match tables.partners.get_mut(&partner.id) {
            Some(existing) if existing.organization_id != partner.organization_id => {
                Err(StoreError::OrganizationIsolation)
            }
            Some(existing) if existing.has_primary_user() => Ok(false),
            Some(existing) => {
                *existing = partner.clone();
                Ok(true)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_partners(&self, organization_id: OrganizationId) -> Result<Vec<Partner>, StoreError> {
        let rows = self
            .read()?
            .partners
            .values()
            .filter(|p| p.belongs_to(organization_id))
            .cloned()
            .collect();
        Ok(sorted_by_name(rows, |p: &Partner| p.name.as_str()))
    }

    async fn insert_user(&self, user: PartnerUser) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("user with email {}", user.email)));
        }
        tables.users.insert(user.id, user);
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<PartnerUser>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn mark_invitation_sent(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.invitation_sent_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essentials_core::Cents;
    use essentials_inventory::{CentsInput, ItemAttributes, ItemStatus};

    fn item(org: OrganizationId, name: &str) -> Item {
        let attrs = ItemAttributes {
            name: Some(name.to_string()),
            partner_key: Some("wipes".to_string()),
            value_in_cents: Some(CentsInput::Amount(100)),
            ..Default::default()
        };
        Item::create(ItemId::new(), org, &attrs, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn reads_are_organization_isolated() {
        let store = InMemoryInventoryStore::new();
        let org_a = OrganizationId::new();
        let org_b = OrganizationId::new();
        let a = item(org_a, "Wipes");
        store.insert_item(a.clone()).await.unwrap();

        assert_eq!(store.get_item(org_a, a.id).await.unwrap(), Some(a.clone()));
        assert_eq!(store.get_item(org_b, a.id).await.unwrap(), None);
        assert!(store.list_items(org_b, &ItemFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_rejects_organization_change() {
        let store = InMemoryInventoryStore::new();
        let mut a = item(OrganizationId::new(), "Wipes");
        store.insert_item(a.clone()).await.unwrap();

        a.organization_id = OrganizationId::new();
        assert_eq!(store.save_item(&a).await, Err(StoreError::OrganizationIsolation));
    }

    #[tokio::test]
    async fn list_filters_by_status_and_sorts_by_name() {
        let store = InMemoryInventoryStore::new();
        let org = OrganizationId::new();
        let mut b = item(org, "b item");
        b.status = ItemStatus::Inactive;
        store.insert_item(item(org, "C item")).await.unwrap();
        store.insert_item(item(org, "a item")).await.unwrap();
        store.insert_item(b).await.unwrap();

        let active: Vec<String> = store
            .list_items(org, &ItemFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(active, vec!["a item", "C item"]);

        let inactive = ItemFilter {
            status: StatusFilter::Inactive,
            ..Default::default()
        };
        assert_eq!(store.list_items(org, &inactive).await.unwrap().len(), 1);
        assert_eq!(store.count_items(org, StatusFilter::All).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn rename_kit_copies_name_to_every_linked_item() {
        let store = InMemoryInventoryStore::new();
        let org = OrganizationId::new();
        let now = Utc::now();
        let mut kit = Kit::create(KitId::new(), org, "Test Kit", Cents::ZERO, true, now).unwrap();
        let kit_item = Item::for_kit(ItemId::new(), &kit, BaseItem::KIT_PARTNER_KEY);
        store.insert_kit(kit.clone(), kit_item.clone()).await.unwrap();

        let mut sibling = Item::for_kit(ItemId::new(), &kit, BaseItem::KIT_PARTNER_KEY);
        sibling.name = "stale".to_string();
        store.insert_item(sibling.clone()).await.unwrap();

        kit.rename("Updated Kit", now).unwrap();
        assert_eq!(store.rename_kit(&kit, None).await.unwrap(), 2);

        for id in [kit_item.id, sibling.id] {
            assert_eq!(store.get_item(org, id).await.unwrap().unwrap().name, "Updated Kit");
        }
        assert_eq!(store.get_kit(org, kit.id).await.unwrap().unwrap().name, "Updated Kit");
    }

    #[tokio::test]
    async fn item_writes_reject_names_taken_outside_the_kit() {
        let store = InMemoryInventoryStore::new();
        let org = OrganizationId::new();
        let now = Utc::now();
        let wipes = item(org, "Wipes");
        store.insert_item(wipes.clone()).await.unwrap();

        assert!(matches!(store.insert_item(item(org, "Wipes")).await, Err(StoreError::NameTaken(_))));
        store.insert_item(item(OrganizationId::new(), "Wipes")).await.unwrap();

        let mut kit = Kit::create(KitId::new(), org, "Test Kit", Cents::ZERO, true, now).unwrap();
        let kit_item = Item::for_kit(ItemId::new(), &kit, BaseItem::KIT_PARTNER_KEY);
        store.insert_kit(kit.clone(), kit_item.clone()).await.unwrap();
        // Siblings in the same kit share the name.
        store
            .insert_item(Item::for_kit(ItemId::new(), &kit, BaseItem::KIT_PARTNER_KEY))
            .await
            .unwrap();

        let mut renamed = kit_item.clone();
        renamed.name = "Wipes".to_string();
        assert!(matches!(store.save_item(&renamed).await, Err(StoreError::NameTaken(_))));

        kit.rename("Wipes", now).unwrap();
        assert!(matches!(store.rename_kit(&kit, None).await, Err(StoreError::NameTaken(_))));
        assert_eq!(store.get_kit(org, kit.id).await.unwrap().unwrap().name, "Test Kit");
        assert_eq!(store.get_item(org, kit_item.id).await.unwrap().unwrap().name, "Test Kit");
    }

    #[tokio::test]
    async fn category_names_are_unique_per_organization() {
        let store = InMemoryInventoryStore::new();
        let org = OrganizationId::new();
        let now = Utc::now();
        let c1 = ItemCategory::create(ItemCategoryId::new(), org, "Diapers", None, now).unwrap();
        let c2 = ItemCategory::create(ItemCategoryId::new(), org, "Diapers", None, now).unwrap();
        let other = ItemCategory::create(ItemCategoryId::new(), OrganizationId::new(), "Diapers", None, now).unwrap();

        store.insert_category(c1).await.unwrap();
        assert!(matches!(store.insert_category(c2).await, Err(StoreError::Duplicate(_))));
        store.insert_category(other).await.unwrap();
    }

    #[tokio::test]
    async fn mark_invited_only_sets_the_first_primary_user() {
        let store = InMemoryPartnerStore::new();
        let org = OrganizationId::new();
        let partner = Partner::create(PartnerId::new(), org, "Helping Hands", "hh@example.org", Utc::now()).unwrap();
        store.insert_partner(partner.clone()).await.unwrap();

        let (first, second) = (UserId::new(), UserId::new());
        let mut a = partner.clone();
        a.mark_invited(first, Utc::now()).unwrap();
        let mut b = partner.clone();
        b.mark_invited(second, Utc::now()).unwrap();

        assert!(store.mark_invited(&a).await.unwrap());
        assert!(!store.mark_invited(&b).await.unwrap());

        let saved = store.get_partner(org, partner.id).await.unwrap().unwrap();
        assert_eq!(saved.profile.primary_user_id, Some(first));

        let mut foreign = b.clone();
        foreign.organization_id = OrganizationId::new();
        assert_eq!(store.mark_invited(&foreign).await, Err(StoreError::OrganizationIsolation));
        assert!(store.mark_invited(&partner).await.is_err());
    }
}
