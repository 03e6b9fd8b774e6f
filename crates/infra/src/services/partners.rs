use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use essentials_core::OrganizationId;
use essentials_partners::{Partner, PartnerId};

use super::ServiceError;
use crate::store::PartnerStore;

/// Organization-scoped partner registry.
pub struct PartnerDirectory {
    store: Arc<dyn PartnerStore>,
}

impl PartnerDirectory {
    pub fn new(store: Arc<dyn PartnerStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, organization_id: OrganizationId, name: &str, email: &str) -> Result<Partner, ServiceError> {
        let partner = Partner::create(PartnerId::new(), organization_id, name, email, Utc::now())?;
        self.store.insert_partner(partner.clone()).await?;
        info!(organization_id = %organization_id, partner_id = %partner.id, "partner created");
        Ok(partner)
    }

    pub async fn get(&self, organization_id: OrganizationId, partner_id: PartnerId) -> Result<Partner, ServiceError> {
        self.store
            .get_partner(organization_id, partner_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn list(&self, organization_id: OrganizationId) -> Result<Vec<Partner>, ServiceError> {
        Ok(self.store.list_partners(organization_id).await?)
    }
}
