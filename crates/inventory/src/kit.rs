use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use essentials_core::{Cents, DomainError, DomainResult, Entity, OrganizationId, OrganizationScoped};

essentials_core::entity_id!(
    /// Kit identifier.
    KitId
);

/// A named grouping of items.
///
/// Every item linked to a kit carries the kit's name; renames go through
/// [`Kit::rename`] and are then propagated to the linked items by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    pub id: KitId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub value_in_cents: Cents,
    pub visible_to_partners: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Kit {
    pub fn create(
        id: KitId,
        organization_id: OrganizationId,
        name: &str,
        value_in_cents: Cents,
        visible_to_partners: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(name)?;
        if value_in_cents.is_negative() {
            return Err(DomainError::validation(
                "value_in_cents must be greater than or equal to 0",
            ));
        }

        Ok(Self {
            id,
            organization_id,
            name,
            value_in_cents,
            visible_to_partners,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rename the kit. Returns `false` when the name is unchanged.
    pub fn rename(&mut self, name: &str, now: DateTime<Utc>) -> DomainResult<bool> {
        let name = validate_name(name)?;
        if name == self.name {
            return Ok(false);
        }
        self.name = name;
        self.updated_at = now;
        Ok(true)
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name can't be blank"));
    }
    Ok(name.to_string())
}

impl Entity for Kit {
    type Id = KitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl OrganizationScoped for Kit {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, ItemId};

    fn kit(name: &str) -> Kit {
        Kit::create(KitId::new(), OrganizationId::new(), name, Cents::new(500), true, Utc::now()).unwrap()
    }

    #[test]
    fn create_trims_and_requires_name() {
        assert_eq!(kit("  Test Kit ").name, "Test Kit");

        let err = Kit::create(KitId::new(), OrganizationId::new(), " ", Cents::ZERO, true, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rename_is_idempotent() {
        let mut k = kit("Test Kit");
        assert!(k.rename("Updated Kit", Utc::now()).unwrap());
        assert!(!k.rename("Updated Kit", Utc::now()).unwrap());
        assert_eq!(k.name, "Updated Kit");
    }

    #[test]
    fn kit_item_starts_in_sync() {
        let k = kit("Test Kit");
        let mut item = Item::for_kit(ItemId::new(), &k, "kit");
        assert_eq!(item.kit_id, Some(k.id));
        assert!(item.in_sync_with(&k));

        item.name = "Drifted".to_string();
        assert!(!item.in_sync_with(&k));
    }
}
