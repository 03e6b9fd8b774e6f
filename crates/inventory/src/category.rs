use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use essentials_core::{DomainError, DomainResult, Entity, OrganizationId, OrganizationScoped};

essentials_core::entity_id!(
    /// Item category identifier.
    ItemCategoryId
);

const MAX_NAME_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 250;

/// Organization-defined grouping for items (e.g. "Diapers", "Hygiene").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCategory {
    pub id: ItemCategoryId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ItemCategory {
    pub fn create(
        id: ItemCategoryId,
        organization_id: OrganizationId,
        name: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut errors = Vec::new();

        let name = name.trim();
        if name.is_empty() {
            errors.push("name can't be blank".to_string());
        } else if name.chars().count() > MAX_NAME_LEN {
            errors.push(format!("name is too long (maximum is {MAX_NAME_LEN} characters)"));
        }

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
            errors.push(format!(
                "description is too long (maximum is {MAX_DESCRIPTION_LEN} characters)"
            ));
        }

        if let Some(err) = DomainError::from_messages(errors) {
            return Err(err);
        }

        Ok(Self {
            id,
            organization_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
        })
    }
}

impl Entity for ItemCategory {
    type Id = ItemCategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl OrganizationScoped for ItemCategory {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_validates_lengths() {
        let long = "x".repeat(51);
        let err = ItemCategory::create(ItemCategoryId::new(), OrganizationId::new(), &long, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("name is too long")));

        let ok = ItemCategory::create(
            ItemCategoryId::new(),
            OrganizationId::new(),
            " Diapers ",
            Some("  "),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ok.name, "Diapers");
        assert_eq!(ok.description, None);
    }
}
