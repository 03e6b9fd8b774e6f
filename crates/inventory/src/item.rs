use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use essentials_core::{Cents, DomainError, DomainResult, Entity, OrganizationId, OrganizationScoped};

use crate::{ItemCategoryId, Kit, KitId};

essentials_core::entity_id!(
    /// Inventory item identifier (organization-scoped via `organization_id`).
    ItemId
);

/// Soft-delete state of an item.
///
/// Items are never physically removed; `destroy` moves them to `Inactive`
/// and `restore` moves them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Inactive,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "inactive" => Ok(ItemStatus::Inactive),
            other => Err(DomainError::validation(format!("unknown item status: {other}"))),
        }
    }

    pub fn is_active(self) -> bool {
        self == ItemStatus::Active
    }

    /// `Active -> Inactive`. `None` when there is nothing to do.
    pub fn deactivate(self) -> Option<ItemStatus> {
        match self {
            ItemStatus::Active => Some(ItemStatus::Inactive),
            ItemStatus::Inactive => None,
        }
    }

    /// `Inactive -> Active`. `None` when there is nothing to do.
    pub fn reactivate(self) -> Option<ItemStatus> {
        match self {
            ItemStatus::Inactive => Some(ItemStatus::Active),
            ItemStatus::Active => None,
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cents amount as submitted by a client: either a plain integer or a
/// currency-formatted string such as `"$5,432.10"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CentsInput {
    Amount(i64),
    Formatted(String),
}

impl CentsInput {
    pub fn to_cents(&self) -> DomainResult<Cents> {
        match self {
            CentsInput::Amount(v) => Ok(Cents::new(*v)),
            CentsInput::Formatted(s) => Cents::parse(s),
        }
    }
}

/// Attribute set accepted by item create/update.
///
/// Unknown keys are rejected during decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub partner_key: Option<String>,
    #[serde(default)]
    pub value_in_cents: Option<CentsInput>,
    #[serde(default)]
    pub package_size: Option<i32>,
    #[serde(default)]
    pub distribution_quantity: Option<i32>,
    #[serde(default)]
    pub visible_to_partners: Option<bool>,
    #[serde(default)]
    pub item_category_id: Option<ItemCategoryId>,
}

impl ItemAttributes {
    /// Normalized name (trimmed); `None` when absent.
    pub fn trimmed_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim)
    }

    fn validate_numbers(&self, errors: &mut Vec<String>) -> Option<Cents> {
        let value = match self.value_in_cents.as_ref().map(CentsInput::to_cents) {
            Some(Ok(v)) if v.is_negative() => {
                errors.push("value_in_cents must be greater than or equal to 0".to_string());
                None
            }
            Some(Ok(v)) => Some(v),
            Some(Err(DomainError::Validation(msg))) => {
                errors.push(msg);
                None
            }
            Some(Err(e)) => {
                errors.push(e.to_string());
                None
            }
            None => None,
        };

        if matches!(self.package_size, Some(v) if v < 0) {
            errors.push("package_size must be greater than or equal to 0".to_string());
        }
        if matches!(self.distribution_quantity, Some(v) if v <= 0) {
            errors.push("distribution_quantity must be greater than 0".to_string());
        }

        value
    }
}

/// Outcome of applying an attribute update to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub previous_name: String,
    pub name_changed: bool,
}

/// Inventory item owned by one organization.
///
/// Invariant: when `kit_id` is set, `name` equals the kit's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub partner_key: String,
    pub value_in_cents: Cents,
    pub package_size: Option<i32>,
    pub distribution_quantity: Option<i32>,
    pub visible_to_partners: bool,
    pub kit_id: Option<KitId>,
    pub item_category_id: Option<ItemCategoryId>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Validate attributes and build a new active item.
    ///
    /// Checks that need storage (partner key lookup, name uniqueness) are the
    /// caller's responsibility.
    pub fn create(
        id: ItemId,
        organization_id: OrganizationId,
        attrs: &ItemAttributes,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut errors = Vec::new();

        let name = match attrs.trimmed_name() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => {
                errors.push("name can't be blank".to_string());
                String::new()
            }
        };
        let partner_key = match attrs.partner_key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => {
                errors.push("partner_key can't be blank".to_string());
                String::new()
            }
        };
        let value = attrs.validate_numbers(&mut errors);

        if let Some(err) = DomainError::from_messages(errors) {
            return Err(err);
        }

        Ok(Self {
            id,
            organization_id,
            name,
            partner_key,
            value_in_cents: value.unwrap_or(Cents::ZERO),
            package_size: attrs.package_size,
            distribution_quantity: attrs.distribution_quantity,
            visible_to_partners: attrs.visible_to_partners.unwrap_or(true),
            kit_id: None,
            item_category_id: attrs.item_category_id,
            status: ItemStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Build the item that represents a kit in inventory.
    pub fn for_kit(id: ItemId, kit: &Kit, partner_key: impl Into<String>) -> Self {
        Self {
            id,
            organization_id: kit.organization_id,
            name: kit.name.clone(),
            partner_key: partner_key.into(),
            value_in_cents: kit.value_in_cents,
            package_size: None,
            distribution_quantity: None,
            visible_to_partners: kit.visible_to_partners,
            kit_id: Some(kit.id),
            item_category_id: None,
            status: ItemStatus::Active,
            created_at: kit.created_at,
            updated_at: kit.updated_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Apply an attribute update. All-or-nothing: on error the item is untouched.
    pub fn apply_update(&mut self, attrs: &ItemAttributes, now: DateTime<Utc>) -> DomainResult<ItemUpdate> {
        let mut errors = Vec::new();

        let new_name = match attrs.trimmed_name() {
            Some("") => {
                errors.push("name can't be blank".to_string());
                None
            }
            other => other.map(str::to_string),
        };
        if matches!(attrs.partner_key.as_deref().map(str::trim), Some("")) {
            errors.push("partner_key can't be blank".to_string());
        }
        let value = attrs.validate_numbers(&mut errors);

        if let Some(err) = DomainError::from_messages(errors) {
            return Err(err);
        }

        let previous_name = self.name.clone();
        let name_changed = new_name.as_deref().is_some_and(|n| n != previous_name);

        if let Some(name) = new_name {
            self.name = name;
        }
        if let Some(key) = attrs.partner_key.as_deref() {
            self.partner_key = key.trim().to_string();
        }
        if let Some(value) = value {
            self.value_in_cents = value;
        }
        if let Some(size) = attrs.package_size {
            self.package_size = Some(size);
        }
        if let Some(qty) = attrs.distribution_quantity {
            self.distribution_quantity = Some(qty);
        }
        if let Some(visible) = attrs.visible_to_partners {
            self.visible_to_partners = visible;
        }
        if let Some(category) = attrs.item_category_id {
            self.item_category_id = Some(category);
        }
        self.updated_at = now;

        Ok(ItemUpdate {
            previous_name,
            name_changed,
        })
    }

    /// Soft delete. Returns `false` if the item was already inactive.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> bool {
        match self.status.deactivate() {
            Some(next) => {
                self.status = next;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Undo a soft delete. Returns `false` if the item was already active.
    pub fn reactivate(&mut self, now: DateTime<Utc>) -> bool {
        match self.status.reactivate() {
            Some(next) => {
                self.status = next;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Clear the category link, returning the previous one.
    pub fn remove_category(&mut self, now: DateTime<Utc>) -> Option<ItemCategoryId> {
        let previous = self.item_category_id.take();
        if previous.is_some() {
            self.updated_at = now;
        }
        previous
    }

    /// Whether the kit-name invariant holds against the given kit.
    pub fn in_sync_with(&self, kit: &Kit) -> bool {
        self.kit_id != Some(kit.id) || self.name == kit.name
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl OrganizationScoped for Item {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn attrs() -> ItemAttributes {
        ItemAttributes {
            name: Some("Really Good Item".to_string()),
            partner_key: Some("adult_incontinence".to_string()),
            value_in_cents: Some(CentsInput::Amount(1001)),
            package_size: Some(5),
            distribution_quantity: Some(30),
            ..Default::default()
        }
    }

    fn new_item() -> Item {
        Item::create(ItemId::new(), OrganizationId::new(), &attrs(), Utc::now()).unwrap()
    }

    #[test]
    fn create_builds_an_active_item() {
        let item = new_item();
        assert_eq!(item.name, "Really Good Item");
        assert_eq!(item.value_in_cents, Cents::new(1001));
        assert_eq!(item.package_size, Some(5));
        assert_eq!(item.status, ItemStatus::Active);
        assert!(item.visible_to_partners);
    }

    #[test]
    fn create_accepts_currency_formatted_value() {
        let mut a = attrs();
        a.value_in_cents = Some(CentsInput::Formatted("$5,432.10".to_string()));
        let item = Item::create(ItemId::new(), OrganizationId::new(), &a, Utc::now()).unwrap();
        assert_eq!(item.value_in_cents, Cents::new(543_210));
    }

    #[test]
    fn create_reports_every_missing_field() {
        let err = Item::create(
            ItemId::new(),
            OrganizationId::new(),
            &ItemAttributes::default(),
            Utc::now(),
        )
        .unwrap_err();

        match err {
            DomainError::Validation(msg) => {
                assert!(msg.contains("name can't be blank"));
                assert!(msg.contains("partner_key can't be blank"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_negative_value_and_zero_quantity() {
        let mut a = attrs();
        a.value_in_cents = Some(CentsInput::Amount(-1));
        a.distribution_quantity = Some(0);
        let err = Item::create(ItemId::new(), OrganizationId::new(), &a, Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(msg) => {
                assert!(msg.contains("value_in_cents"));
                assert!(msg.contains("distribution_quantity"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn attributes_reject_unknown_keys() {
        let res: Result<ItemAttributes, _> = serde_json::from_value(serde_json::json!({ "bad": "params" }));
        assert!(res.is_err());
    }

    #[test]
    fn attributes_accept_string_or_number_value() {
        let a: ItemAttributes =
            serde_json::from_value(serde_json::json!({ "value_in_cents": "$1.00" })).unwrap();
        assert_eq!(a.value_in_cents, Some(CentsInput::Formatted("$1.00".to_string())));

        let b: ItemAttributes = serde_json::from_value(serde_json::json!({ "value_in_cents": 100 })).unwrap();
        assert_eq!(b.value_in_cents, Some(CentsInput::Amount(100)));
    }

    #[test]
    fn update_toggles_visibility() {
        let mut item = new_item();
        let patch = ItemAttributes {
            value_in_cents: Some(CentsInput::Amount(100)),
            visible_to_partners: Some(false),
            ..Default::default()
        };
        let outcome = item.apply_update(&patch, Utc::now()).unwrap();
        assert!(!outcome.name_changed);
        assert!(!item.visible_to_partners);
        assert_eq!(item.value_in_cents, Cents::new(100));
    }

    #[test]
    fn update_reports_name_change_only_when_different() {
        let mut item = new_item();
        let same = ItemAttributes {
            name: Some("Really Good Item".to_string()),
            ..Default::default()
        };
        assert!(!item.apply_update(&same, Utc::now()).unwrap().name_changed);

        let renamed = ItemAttributes {
            name: Some("Updated Kit".to_string()),
            ..Default::default()
        };
        let outcome = item.apply_update(&renamed, Utc::now()).unwrap();
        assert!(outcome.name_changed);
        assert_eq!(outcome.previous_name, "Really Good Item");
        assert_eq!(item.name, "Updated Kit");
    }

    #[test]
    fn failed_update_leaves_item_untouched() {
        let mut item = new_item();
        let before = item.clone();
        let patch = ItemAttributes {
            name: Some("   ".to_string()),
            visible_to_partners: Some(false),
            ..Default::default()
        };
        assert!(item.apply_update(&patch, Utc::now()).is_err());
        assert_eq!(item, before);
    }

    #[test]
    fn remove_category_is_idempotent() {
        let mut item = new_item();
        let category = ItemCategoryId::new();
        item.item_category_id = Some(category);

        assert_eq!(item.remove_category(Utc::now()), Some(category));
        assert_eq!(item.remove_category(Utc::now()), None);
        assert_eq!(item.item_category_id, None);
    }

    #[test]
    fn status_parse_matches_as_str() {
        for s in [ItemStatus::Active, ItemStatus::Inactive] {
            assert_eq!(ItemStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(ItemStatus::parse("deleted").is_err());
    }

    proptest! {
        #[test]
        fn status_transitions_follow_the_last_effective_operation(ops in proptest::collection::vec(any::<bool>(), 0..32)) {
            let mut item = new_item();
            let mut active = true;
            for deactivate in ops {
                let changed = if deactivate {
                    item.deactivate(Utc::now())
                } else {
                    item.reactivate(Utc::now())
                };
                // A transition happens exactly when it moves away from the current state.
                prop_assert_eq!(changed, deactivate == active);
                active = !deactivate;
                prop_assert_eq!(item.is_active(), active);
            }
        }
    }
}
