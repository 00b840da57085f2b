//! Catalog store over a direct `PostgreSQL` connection.
//!
//! Used when `STOCKROOM_DATABASE_URL` points at the Supabase database. The
//! connection role is trusted as-is, so the caller's [`Scope`] is not
//! applied; row-level security only exists on the PostgREST path.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use stockroom_core::{
    Email, InventoryRecord, NewTransfer, Product, ProductId, Quantity, Sku, StorageId,
    StorageLocation, Transfer, TransferId,
};

use super::{
    CatalogStore, INVENTORY_VIEW, PRODUCTS_TABLE, RecordFilter, Scope, StoreError, TRANSFERS_TABLE,
};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    active: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            sku: Sku::from_store(&row.sku).map_err(|e| malformed(PRODUCTS_TABLE, e))?,
            name: row.name,
            active: row.active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StorageRow {
    id: i64,
    name: String,
    active: bool,
}

impl From<StorageRow> for StorageLocation {
    fn from(row: StorageRow) -> Self {
        Self {
            id: StorageId::new(row.id),
            name: row.name,
            active: row.active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    sku: String,
    product_name: String,
    storage_name: String,
    quantity: i64,
}

impl TryFrom<InventoryRow> for InventoryRecord {
    type Error = StoreError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            sku: Sku::from_store(&row.sku).map_err(|e| malformed(INVENTORY_VIEW, e))?,
            product_name: row.product_name,
            storage_name: row.storage_name,
            quantity: Quantity::try_from(row.quantity).map_err(|e| malformed(INVENTORY_VIEW, e))?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: i64,
    product_id: i64,
    from_storage_id: i64,
    to_storage_id: i64,
    quantity: i64,
    user_email: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransferRow> for Transfer {
    type Error = StoreError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TransferId::new(row.id),
            product_id: ProductId::new(row.product_id),
            from_storage_id: StorageId::new(row.from_storage_id),
            to_storage_id: StorageId::new(row.to_storage_id),
            quantity: Quantity::try_from(row.quantity)
                .map_err(|e| malformed(TRANSFERS_TABLE, e))?,
            user_email: Email::parse(&row.user_email).map_err(|e| malformed(TRANSFERS_TABLE, e))?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

fn malformed(table: &'static str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Malformed {
        table,
        reason: err.to_string(),
    }
}

/// Errors the database reports about a query become rejections; pool and
/// I/O failures stay connection errors.
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => StoreError::Rejected {
            status: None,
            code: db.code().map(|c| c.into_owned()),
            message: db.message().to_string(),
        },
        other => StoreError::Database(other),
    }
}

// =============================================================================
// Store
// =============================================================================

/// [`CatalogStore`] backed by a `sqlx` pool.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    fn backend_name(&self) -> &'static str {
        "Postgres"
    }

    #[instrument(skip(self, _scope))]
    async fn products(
        &self,
        _scope: &Scope,
        filter: RecordFilter,
    ) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, sku, name, active
            FROM products
            WHERE ($1 = false OR active)
            ORDER BY sku ASC
            ",
        )
        .bind(filter == RecordFilter::ActiveOnly)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, _scope))]
    async fn storages(
        &self,
        _scope: &Scope,
        filter: RecordFilter,
    ) -> Result<Vec<StorageLocation>, StoreError> {
        let rows = sqlx::query_as::<_, StorageRow>(
            r"
            SELECT id, name, active
            FROM storages
            WHERE ($1 = false OR active)
            ORDER BY name ASC
            ",
        )
        .bind(filter == RecordFilter::ActiveOnly)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, _scope))]
    async fn inventory(&self, _scope: &Scope) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r"
            SELECT sku, product_name, storage_name, quantity::int8 AS quantity
            FROM inventory_report
            ORDER BY product_name ASC, storage_name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, _scope, transfer), fields(product_id = %transfer.product_id()))]
    async fn record_transfer(
        &self,
        _scope: &Scope,
        transfer: &NewTransfer,
    ) -> Result<Transfer, StoreError> {
        let row = sqlx::query_as::<_, TransferRow>(
            r"
            INSERT INTO transactions
                (product_id, from_storage_id, to_storage_id, quantity, user_email, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, product_id, from_storage_id, to_storage_id,
                      quantity::int8 AS quantity, user_email, notes, created_at
            ",
        )
        .bind(transfer.product_id().get())
        .bind(transfer.from_storage_id().get())
        .bind(transfer.to_storage_id().get())
        .bind(i64::from(transfer.quantity().get()))
        .bind(transfer.user_email().as_str())
        .bind(transfer.notes())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        row.try_into()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}
