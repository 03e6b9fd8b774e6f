//! Organization-isolated persistence for inventory and partner records.
//!
//! Every read takes the caller's `OrganizationId` and never returns another
//! organization's rows. Each trait method is the unit of atomicity: multi-row
//! changes (kit renames, kit creation) happen inside a single call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use essentials_core::{DomainError, OrganizationId, UserId};
use essentials_inventory::{BaseItem, Item, ItemCategory, ItemCategoryId, ItemId, ItemStatus, Kit, KitId};
use essentials_partners::{Partner, PartnerId, PartnerUser};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryInventoryStore, InMemoryPartnerStore};
pub use postgres::{PostgresInventoryStore, PostgresPartnerStore};

/// Store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("organization isolation violation")]
    OrganizationIsolation,
    #[error("duplicate record: {0}")]
    Duplicate(String),
    /// Another item of the organization already carries this name.
    #[error("item name already taken: {0}")]
    NameTaken(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Which soft-delete states a query should see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Active,
    Inactive,
    All,
}

impl StatusFilter {
    pub fn matches(self, status: ItemStatus) -> bool {
        match self {
            StatusFilter::Active => status == ItemStatus::Active,
            StatusFilter::Inactive => status == ItemStatus::Inactive,
            StatusFilter::All => true,
        }
    }

    /// The single status to match, `None` for `All`.
    pub fn status(self) -> Option<ItemStatus> {
        match self {
            StatusFilter::Active => Some(ItemStatus::Active),
            StatusFilter::Inactive => Some(ItemStatus::Inactive),
            StatusFilter::All => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "all" => Ok(StatusFilter::All),
            other => ItemStatus::parse(other).map(|s| match s {
                ItemStatus::Active => StatusFilter::Active,
                ItemStatus::Inactive => StatusFilter::Inactive,
            }),
        }
    }
}

/// Item listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub status: StatusFilter,
    pub category_id: Option<ItemCategoryId>,
    pub kit_id: Option<KitId>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        self.status.matches(item.status)
            && self.category_id.is_none_or(|c| item.item_category_id == Some(c))
            && self.kit_id.is_none_or(|k| item.kit_id == Some(k))
    }
}

/// Persistence for items, kits, categories and the base item catalogue.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn base_item(&self, partner_key: &str) -> Result<Option<BaseItem>, StoreError>;

    async fn list_base_items(&self) -> Result<Vec<BaseItem>, StoreError>;

    /// Item writes (`insert_item`, `save_item`, `insert_kit`, `rename_kit`)
    /// fail with [`StoreError::NameTaken`] when another item of the
    /// organization carries the name. Items of the same kit may share it.
    async fn insert_item(&self, item: Item) -> Result<(), StoreError>;

    /// Fetch an item of the organization regardless of status.
    async fn get_item(&self, organization_id: OrganizationId, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Overwrite an existing item. The stored row must belong to the same organization.
    async fn save_item(&self, item: &Item) -> Result<(), StoreError>;

    /// Items matching the filter, ordered by name.
    async fn list_items(&self, organization_id: OrganizationId, filter: &ItemFilter) -> Result<Vec<Item>, StoreError>;

    async fn count_items(&self, organization_id: OrganizationId, status: StatusFilter) -> Result<usize, StoreError>;

    /// Insert a kit together with the item that represents it.
    async fn insert_kit(&self, kit: Kit, kit_item: Item) -> Result<(), StoreError>;

    async fn get_kit(&self, organization_id: OrganizationId, id: KitId) -> Result<Option<Kit>, StoreError>;

    /// Persist an already renamed kit and copy its name onto every linked item.
    ///
    /// `pending_item` (if any) is saved in the same step, before the name is
    /// copied. Returns the number of linked items.
    async fn rename_kit(&self, kit: &Kit, pending_item: Option<&Item>) -> Result<usize, StoreError>;

    async fn insert_category(&self, category: ItemCategory) -> Result<(), StoreError>;

    async fn get_category(
        &self,
        organization_id: OrganizationId,
        id: ItemCategoryId,
    ) -> Result<Option<ItemCategory>, StoreError>;

    /// Categories of the organization, ordered by name.
    async fn list_categories(&self, organization_id: OrganizationId) -> Result<Vec<ItemCategory>, StoreError>;
}

/// Persistence for partners, their profiles and portal users.
#[async_trait]
pub trait PartnerStore: Send + Sync {
    async fn insert_partner(&self, partner: Partner) -> Result<(), StoreError>;

    async fn get_partner(&self, organization_id: OrganizationId, id: PartnerId) -> Result<Option<Partner>, StoreError>;

    /// Overwrite partner and profile together.
    async fn save_partner(&self, partner: &Partner) -> Result<(), StoreError>;

    /// Persist an invited partner only if the stored profile has no primary
    /// user yet. Returns `false`, writing nothing, when another invite won.
    async fn mark_invited(&self, partner: &Partner) -> Result<bool, StoreError>;

    async fn list_partners(&self, organization_id: OrganizationId) -> Result<Vec<Partner>, StoreError>;

    /// Insert a user. Emails are unique across all users.
    async fn insert_user(&self, user: PartnerUser) -> Result<(), StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<PartnerUser>, StoreError>;

    async fn mark_invitation_sent(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;
}
