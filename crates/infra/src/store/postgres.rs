//! Postgres-backed stores.
//!
//! ## Organization isolation
//!
//! Every query includes `organization_id` in its WHERE clause. Writes that match
//! no row are re-checked to tell "missing" apart from "owned by someone else".
//!
//! ## Atomicity
//!
//! Multi-row changes (kit creation, kit rename propagation, partner + profile
//! writes) run inside one SQL transaction; dropping the transaction on an early
//! return rolls it back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, PgPool, Postgres, Row};
use uuid::Uuid;

use essentials_core::{Cents, OrganizationId, UserId};
use essentials_inventory::{BaseItem, Item, ItemCategory, ItemCategoryId, ItemId, ItemStatus, Kit, KitId};
use essentials_partners::{Partner, PartnerId, PartnerStatus, PartnerUser, Profile, ProfileId};

use super::{InventoryStore, ItemFilter, PartnerStore, StatusFilter, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Create the schema if it does not exist yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("run_migrations", e))?;
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Storage(format!("connection pool closed in {}", operation)),
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|e| map_sqlx_error("decode_row", e))
}

fn decode_err(e: essentials_core::DomainError) -> StoreError {
    StoreError::Storage(format!("corrupt row: {e}"))
}

macro_rules! item_columns {
    () => {
        "id, organization_id, name, partner_key, value_in_cents, package_size, \
         distribution_quantity, visible_to_partners, kit_id, item_category_id, status, \
         created_at, updated_at"
    };
}

macro_rules! kit_columns {
    () => {
        "id, organization_id, name, value_in_cents, visible_to_partners, active, created_at, updated_at"
    };
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    let status: String = col(row, "status")?;
    Ok(Item {
        id: ItemId::from_uuid(col(row, "id")?),
        organization_id: OrganizationId::from_uuid(col(row, "organization_id")?),
        name: col(row, "name")?,
        partner_key: col(row, "partner_key")?,
        value_in_cents: Cents::new(col(row, "value_in_cents")?),
        package_size: col(row, "package_size")?,
        distribution_quantity: col(row, "distribution_quantity")?,
        visible_to_partners: col(row, "visible_to_partners")?,
        kit_id: col::<Option<Uuid>>(row, "kit_id")?.map(KitId::from_uuid),
        item_category_id: col::<Option<Uuid>>(row, "item_category_id")?.map(ItemCategoryId::from_uuid),
        status: ItemStatus::parse(&status).map_err(decode_err)?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn kit_from_row(row: &PgRow) -> Result<Kit, StoreError> {
    Ok(Kit {
        id: KitId::from_uuid(col(row, "id")?),
        organization_id: OrganizationId::from_uuid(col(row, "organization_id")?),
        name: col(row, "name")?,
        value_in_cents: Cents::new(col(row, "value_in_cents")?),
        visible_to_partners: col(row, "visible_to_partners")?,
        active: col(row, "active")?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<ItemCategory, StoreError> {
    Ok(ItemCategory {
        id: ItemCategoryId::from_uuid(col(row, "id")?),
        organization_id: OrganizationId::from_uuid(col(row, "organization_id")?),
        name: col(row, "name")?,
        description: col(row, "description")?,
        created_at: col(row, "created_at")?,
    })
}

fn insert_item_query(item: &Item) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(concat!(
        "INSERT INTO items (",
        item_columns!(),
        ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
    ))
    .bind(*item.id.as_uuid())
    .bind(*item.organization_id.as_uuid())
    .bind(&item.name)
    .bind(&item.partner_key)
    .bind(item.value_in_cents.get())
    .bind(item.package_size)
    .bind(item.distribution_quantity)
    .bind(item.visible_to_partners)
    .bind(item.kit_id.map(|k| *k.as_uuid()))
    .bind(item.item_category_id.map(|c| *c.as_uuid()))
    .bind(item.status.as_str())
    .bind(item.created_at)
    .bind(item.updated_at)
}

fn update_item_query(item: &Item) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(
        r#"
        UPDATE items SET
            name = $3,
            partner_key = $4,
            value_in_cents = $5,
            package_size = $6,
            distribution_quantity = $7,
            visible_to_partners = $8,
            kit_id = $9,
            item_category_id = $10,
            status = $11,
            updated_at = $12
        WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(*item.id.as_uuid())
    .bind(*item.organization_id.as_uuid())
    .bind(&item.name)
    .bind(&item.partner_key)
    .bind(item.value_in_cents.get())
    .bind(item.package_size)
    .bind(item.distribution_quantity)
    .bind(item.visible_to_partners)
    .bind(item.kit_id.map(|k| *k.as_uuid()))
    .bind(item.item_category_id.map(|c| *c.as_uuid()))
    .bind(item.status.as_str())
    .bind(item.updated_at)
}

/// Postgres inventory store (`items`, `kits`, `item_categories`, `base_items`).
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Upsert catalogue entries (idempotent).
    pub async fn seed_base_items(&self, base_items: &[BaseItem]) -> Result<(), StoreError> {
        for b in base_items {
            sqlx::query(
                r#"
                INSERT INTO base_items (partner_key, name, category)
                VALUES ($1, $2, $3)
                ON CONFLICT (partner_key) DO UPDATE SET name = EXCLUDED.name, category = EXCLUDED.category
                "#,
            )
            .bind(&b.partner_key)
            .bind(&b.name)
            .bind(&b.category)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("seed_base_items", e))?;
        }
        Ok(())
    }

    /// Tell a missing row apart from a row owned by another organization.
    async fn missing_or_foreign(&self, table: &'static str, id: Uuid) -> StoreError {
        let sql = format!("SELECT 1 FROM {table} WHERE id = $1");
        match sqlx::query(&sql).bind(id).fetch_optional(&*self.pool).await {
            Ok(Some(_)) => StoreError::OrganizationIsolation,
            Ok(None) => StoreError::NotFound,
            Err(e) => map_sqlx_error("missing_or_foreign", e),
        }
    }
}

/// Serialize writers of one item name within an organization, then fail
/// with `NameTaken` if another item already carries it. The lock is released
/// when the surrounding transaction ends.
async fn claim_item_name(
    conn: &mut PgConnection,
    organization_id: OrganizationId,
    name: &str,
    item_id: Option<ItemId>,
    kit_id: Option<KitId>,
) -> Result<(), StoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text || '/' || $2, 0))")
        .bind(*organization_id.as_uuid())
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("lock_item_name", e))?;

    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM items
            WHERE organization_id = $1 AND name = $2
                AND ($3::uuid IS NULL OR id <> $3)
                AND ($4::uuid IS NULL OR kit_id IS DISTINCT FROM $4)
        )
        "#,
    )
    .bind(*organization_id.as_uuid())
    .bind(name)
    .bind(item_id.map(|i| *i.as_uuid()))
    .bind(kit_id.map(|k| *k.as_uuid()))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("check_item_name", e))?;

    if taken {
        return Err(StoreError::NameTaken(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn base_item(&self, partner_key: &str) -> Result<Option<BaseItem>, StoreError> {
        let row = sqlx::query("SELECT partner_key, name, category FROM base_items WHERE partner_key = $1")
            .bind(partner_key)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("base_item", e))?;

        row.map(|r| {
            Ok(BaseItem {
                partner_key: col(&r, "partner_key")?,
                name: col(&r, "name")?,
                category: col(&r, "category")?,
            })
        })
        .transpose()
    }

    async fn list_base_items(&self) -> Result<Vec<BaseItem>, StoreError> {
        let rows = sqlx::query("SELECT partner_key, name, category FROM base_items ORDER BY lower(name)")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_base_items", e))?;

        rows.iter()
            .map(|r| {
                Ok(BaseItem {
                    partner_key: col(r, "partner_key")?,
                    name: col(r, "name")?,
                    category: col(r, "category")?,
                })
            })
            .collect()
    }

    async fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        claim_item_name(&mut *tx, item.organization_id, &item.name, Some(item.id), item.kit_id).await?;
        insert_item_query(&item)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_item", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn get_item(&self, organization_id: OrganizationId, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(concat!(
            "SELECT ",
            item_columns!(),
            " FROM items WHERE organization_id = $1 AND id = $2"
        ))
        .bind(*organization_id.as_uuid())
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn save_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        claim_item_name(&mut *tx, item.organization_id, &item.name, Some(item.id), item.kit_id).await?;
        let res = update_item_query(item)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save_item", e))?;

        if res.rows_affected() == 0 {
            drop(tx);
            return Err(self.missing_or_foreign("items", *item.id.as_uuid()).await);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn list_items(&self, organization_id: OrganizationId, filter: &ItemFilter) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            item_columns!(),
            r#" FROM items
            WHERE organization_id = $1
                AND ($2::text IS NULL OR status = $2)
                AND ($3::uuid IS NULL OR item_category_id = $3)
                AND ($4::uuid IS NULL OR kit_id = $4)
            ORDER BY lower(name)"#
        ))
        .bind(*organization_id.as_uuid())
        .bind(filter.status.status().map(ItemStatus::as_str))
        .bind(filter.category_id.map(|c| *c.as_uuid()))
        .bind(filter.kit_id.map(|k| *k.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    async fn count_items(&self, organization_id: OrganizationId, status: StatusFilter) -> Result<usize, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM items WHERE organization_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(*organization_id.as_uuid())
        .bind(status.status().map(ItemStatus::as_str))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_items", e))?;

        let total: i64 = col(&row, "total")?;
        Ok(total as usize)
    }

    async fn insert_kit(&self, kit: Kit, kit_item: Item) -> Result<(), StoreError> {
        if kit_item.kit_id != Some(kit.id) || kit_item.organization_id != kit.organization_id {
            return Err(StoreError::OrganizationIsolation);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        claim_item_name(&mut *tx, kit.organization_id, &kit_item.name, Some(kit_item.id), Some(kit.id)).await?;
        sqlx::query(concat!(
            "INSERT INTO kits (",
            kit_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(*kit.id.as_uuid())
        .bind(*kit.organization_id.as_uuid())
        .bind(&kit.name)
        .bind(kit.value_in_cents.get())
        .bind(kit.visible_to_partners)
        .bind(kit.active)
        .bind(kit.created_at)
        .bind(kit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_kit", e))?;

        insert_item_query(&kit_item)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_kit_item", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn get_kit(&self, organization_id: OrganizationId, id: KitId) -> Result<Option<Kit>, StoreError> {
        let row = sqlx::query(concat!(
            "SELECT ",
            kit_columns!(),
            " FROM kits WHERE organization_id = $1 AND id = $2"
        ))
        .bind(*organization_id.as_uuid())
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_kit", e))?;

        row.as_ref().map(kit_from_row).transpose()
    }

    async fn rename_kit(&self, kit: &Kit, pending_item: Option<&Item>) -> Result<usize, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        claim_item_name(&mut *tx, kit.organization_id, &kit.name, None, Some(kit.id)).await?;

        let res = sqlx::query(
            r#"
            UPDATE kits SET
                name = $3,
                value_in_cents = $4,
                visible_to_partners = $5,
                active = $6,
                updated_at = $7
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(*kit.id.as_uuid())
        .bind(*kit.organization_id.as_uuid())
        .bind(&kit.name)
        .bind(kit.value_in_cents.get())
        .bind(kit.visible_to_partners)
        .bind(kit.active)
        .bind(kit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("rename_kit", e))?;

        if res.rows_affected() == 0 {
            drop(tx);
            return Err(self.missing_or_foreign("kits", *kit.id.as_uuid()).await);
        }

        if let Some(item) = pending_item {
            let res = update_item_query(item)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("rename_kit_item", e))?;
            if res.rows_affected() == 0 {
                drop(tx);
                return Err(self.missing_or_foreign("items", *item.id.as_uuid()).await);
            }
        }

        let renamed = sqlx::query(
            "UPDATE items SET name = $3, updated_at = $4 WHERE kit_id = $1 AND organization_id = $2",
        )
        .bind(*kit.id.as_uuid())
        .bind(*kit.organization_id.as_uuid())
        .bind(&kit.name)
        .bind(kit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("propagate_kit_name", e))?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(renamed as usize)
    }

    async fn insert_category(&self, category: ItemCategory) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO item_categories (id, organization_id, name, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*category.id.as_uuid())
        .bind(*category.organization_id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    async fn get_category(
        &self,
        organization_id: OrganizationId,
        id: ItemCategoryId,
    ) -> Result<Option<ItemCategory>, StoreError> {
        let row = sqlx::query(
            "SELECT id, organization_id, name, description, created_at FROM item_categories WHERE organization_id = $1 AND id = $2",
        )
        .bind(*organization_id.as_uuid())
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?;

        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_categories(&self, organization_id: OrganizationId) -> Result<Vec<ItemCategory>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, organization_id, name, description, created_at FROM item_categories WHERE organization_id = $1 ORDER BY lower(name)",
        )
        .bind(*organization_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.iter().map(category_from_row).collect()
    }
}

macro_rules! partner_select {
    () => {
        r#"
        SELECT
            p.id, p.organization_id, p.name, p.email, p.status, p.created_at, p.updated_at,
            pr.id AS profile_id, pr.primary_user_id
        FROM partners p
        JOIN partner_profiles pr ON pr.partner_id = p.id
        "#
    };
}

fn partner_from_row(row: &PgRow) -> Result<Partner, StoreError> {
    let status: String = col(row, "status")?;
    Ok(Partner {
        id: PartnerId::from_uuid(col(row, "id")?),
        organization_id: OrganizationId::from_uuid(col(row, "organization_id")?),
        name: col(row, "name")?,
        email: col(row, "email")?,
        status: PartnerStatus::parse(&status).map_err(decode_err)?,
        profile: Profile {
            id: ProfileId::from_uuid(col(row, "profile_id")?),
            primary_user_id: col::<Option<Uuid>>(row, "primary_user_id")?.map(UserId::from_uuid),
        },
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<PartnerUser, StoreError> {
    Ok(PartnerUser {
        id: UserId::from_uuid(col(row, "id")?),
        email: col(row, "email")?,
        name: col(row, "name")?,
        profile_id: ProfileId::from_uuid(col(row, "profile_id")?),
        invitation_sent_at: col(row, "invitation_sent_at")?,
        last_sign_in_at: col(row, "last_sign_in_at")?,
        created_at: col(row, "created_at")?,
    })
}

/// Postgres partner store (`partners`, `partner_profiles`, `partner_users`).
pub struct PostgresPartnerStore {
    pool: Arc<PgPool>,
}

impl PostgresPartnerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl PartnerStore for PostgresPartnerStore {
    async fn insert_partner(&self, partner: Partner) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO partners (id, organization_id, name, email, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*partner.id.as_uuid())
        .bind(*partner.organization_id.as_uuid())
        .bind(&partner.name)
        .bind(&partner.email)
        .bind(partner.status.as_str())
        .bind(partner.created_at)
        .bind(partner.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_partner", e))?;

        sqlx::query("INSERT INTO partner_profiles (id, partner_id, primary_user_id) VALUES ($1, $2, $3)")
            .bind(*partner.profile.id.as_uuid())
            .bind(*partner.id.as_uuid())
            .bind(partner.profile.primary_user_id.map(|u| *u.as_uuid()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_partner_profile", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn get_partner(&self, organization_id: OrganizationId, id: PartnerId) -> Result<Option<Partner>, StoreError> {
        let row = sqlx::query(concat!(partner_select!(), " WHERE p.organization_id = $1 AND p.id = $2"))
            .bind(*organization_id.as_uuid())
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_partner", e))?;

        row.as_ref().map(partner_from_row).transpose()
    }

    async fn save_partner(&self, partner: &Partner) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let res = sqlx::query(
            r#"
            UPDATE partners SET name = $3, email = $4, status = $5, updated_at = $6
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(*partner.id.as_uuid())
        .bind(*partner.organization_id.as_uuid())
        .bind(&partner.name)
        .bind(&partner.email)
        .bind(partner.status.as_str())
        .bind(partner.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("save_partner", e))?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM partners WHERE id = $1")
                .bind(*partner.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("save_partner", e))?;
            return Err(if exists.is_some() {
                StoreError::OrganizationIsolation
            } else {
                StoreError::NotFound
            });
        }

        sqlx::query("UPDATE partner_profiles SET primary_user_id = $2 WHERE partner_id = $1")
            .bind(*partner.id.as_uuid())
            .bind(partner.profile.primary_user_id.map(|u| *u.as_uuid()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save_partner_profile", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn mark_invited(&self, partner: &Partner) -> Result<bool, StoreError> {
        let user_id = partner
            .profile
            .primary_user_id
            .ok_or_else(|| StoreError::Storage("mark_invited requires a primary user".to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Concurrent invites serialize on the profile row; the loser re-reads a non-null user.
        let res = sqlx::query(
            r#"
            UPDATE partner_profiles pp SET primary_user_id = $3
            FROM partners p
            WHERE pp.partner_id = p.id AND p.id = $1 AND p.organization_id = $2
              AND pp.primary_user_id IS NULL
            "#,
        )
        .bind(*partner.id.as_uuid())
        .bind(*partner.organization_id.as_uuid())
        .bind(*user_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("mark_invited_profile", e))?;

        if res.rows_affected() == 0 {
            let owner: Option<Uuid> = sqlx::query_scalar("SELECT organization_id FROM partners WHERE id = $1")
                .bind(*partner.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("mark_invited", e))?;
            return match owner {
                None => Err(StoreError::NotFound),
                Some(org) if org != *partner.organization_id.as_uuid() => Err(StoreError::OrganizationIsolation),
                Some(_) => Ok(false),
            };
        }

        sqlx::query("UPDATE partners SET status = $3, updated_at = $4 WHERE id = $1 AND organization_id = $2")
            .bind(*partner.id.as_uuid())
            .bind(*partner.organization_id.as_uuid())
            .bind(partner.status.as_str())
            .bind(partner.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("mark_invited", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(true)
    }

    async fn list_partners(&self, organization_id: OrganizationId) -> Result<Vec<Partner>, StoreError> {
        let rows = sqlx::query(concat!(partner_select!(), " WHERE p.organization_id = $1 ORDER BY lower(p.name)"))
            .bind(*organization_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_partners", e))?;

        rows.iter().map(partner_from_row).collect()
    }

    async fn insert_user(&self, user: PartnerUser) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO partner_users (id, email, name, profile_id, invitation_sent_at, last_sign_in_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(*user.profile_id.as_uuid())
        .bind(user.invitation_sent_at)
        .bind(user.last_sign_in_at)
        .bind(user.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<PartnerUser>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, profile_id, invitation_sent_at, last_sign_in_at, created_at
            FROM partner_users WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn mark_invitation_sent(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE partner_users SET invitation_sent_at = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_invitation_sent", e))?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
