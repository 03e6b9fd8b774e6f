//! Service wiring: picks store and identity backends from configuration.

use std::sync::Arc;

use sqlx::PgPool;

use essentials_infra::config::AppConfig;
use essentials_infra::identity::{HttpIdentityProvider, IdentityError, IdentityProvider, LocalIdentityProvider};
use essentials_infra::services::{
    ItemCategoryService, ItemLifecycleManager, KitManager, PartnerDirectory, PartnerInviteService,
};
use essentials_infra::store::{
    InMemoryInventoryStore, InMemoryPartnerStore, InventoryStore, PartnerStore, PostgresInventoryStore,
    PostgresPartnerStore, StoreError, postgres,
};
use essentials_inventory::BaseItem;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to connect to Postgres: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

pub struct AppServices {
    pub items: ItemLifecycleManager,
    pub kits: KitManager,
    pub categories: ItemCategoryService,
    pub partners: PartnerDirectory,
    pub invites: PartnerInviteService,
}

impl AppServices {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        partners: Arc<dyn PartnerStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            items: ItemLifecycleManager::new(Arc::clone(&inventory)),
            kits: KitManager::new(Arc::clone(&inventory)),
            categories: ItemCategoryService::new(inventory),
            partners: PartnerDirectory::new(Arc::clone(&partners)),
            invites: PartnerInviteService::new(partners, identity),
        }
    }

    /// In-memory stores with the local identity provider (dev/test).
    pub fn in_memory() -> Self {
        let partners: Arc<dyn PartnerStore> = Arc::new(InMemoryPartnerStore::new());
        let identity = Arc::new(LocalIdentityProvider::new(Arc::clone(&partners)));
        Self::new(Arc::new(InMemoryInventoryStore::new()), partners, identity)
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let (inventory, partners): (Arc<dyn InventoryStore>, Arc<dyn PartnerStore>) = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await?;
            postgres::run_migrations(&pool).await?;

            let inventory = PostgresInventoryStore::new(pool.clone());
            inventory.seed_base_items(&BaseItem::seed_catalog()).await?;
            tracing::info!("using Postgres stores");
            (Arc::new(inventory), Arc::new(PostgresPartnerStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            (
                Arc::new(InMemoryInventoryStore::new()),
                Arc::new(InMemoryPartnerStore::new()),
            )
        }
    };

    let identity: Arc<dyn IdentityProvider> = match &config.identity_service_url {
        Some(url) => {
            tracing::info!(url = %url, "using remote identity service");
            Arc::new(HttpIdentityProvider::new(url.clone())?)
        }
        None => Arc::new(LocalIdentityProvider::new(Arc::clone(&partners))),
    };

    Ok(AppServices::new(inventory, partners, identity))
}
