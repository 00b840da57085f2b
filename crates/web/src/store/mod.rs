//! Catalog store seam.
//!
//! Page loads read products, storage locations and the inventory report
//! through [`CatalogStore`]. Two backends exist:
//!
//! - [`crate::supabase::PostgrestStore`] - the hosted PostgREST API (default)
//! - [`postgres::PgCatalogStore`] - the same queries over a direct `sqlx` pool
//!
//! Queries always return rows in the order page data shows them: products by
//! SKU, storages by name, inventory by product name then storage name.

#[cfg(test)]
pub mod fake;
pub mod postgres;

use async_trait::async_trait;
use stockroom_core::{InventoryRecord, NewTransfer, Product, StorageLocation, Transfer};
use thiserror::Error;

use crate::identity::AccessToken;

/// Table holding products.
pub const PRODUCTS_TABLE: &str = "products";
/// Table holding storage locations.
pub const STORAGES_TABLE: &str = "storages";
/// View joining stock levels with product and storage names.
pub const INVENTORY_VIEW: &str = "inventory_report";
/// Table transfers are written to.
pub const TRANSFERS_TABLE: &str = "transactions";

/// Errors returned by catalog store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store received the query and refused it (bad column, RLS, ...).
    #[error("{message}")]
    Rejected {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// HTTP transport failure or undecodable PostgREST response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection-level database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row came back that does not fit the domain types.
    #[error("malformed {table} row: {reason}")]
    Malformed { table: &'static str, reason: String },

    /// Endpoint URL could not be built.
    #[error("invalid store endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl StoreError {
    /// Whether the store itself answered with an error.
    ///
    /// Everything else means the store could not be reached or answered
    /// with something unreadable.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Who a query runs as.
///
/// The hosted backend applies row-level security per user, so reads and
/// writes carry the caller's access token when there is one.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    access_token: Option<AccessToken>,
}

impl Scope {
    #[must_use]
    pub fn user(access_token: AccessToken) -> Self {
        Self {
            access_token: Some(access_token),
        }
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self { access_token: None }
    }

    #[must_use]
    pub const fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }
}

/// Which products/storages a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFilter {
    #[default]
    All,
    ActiveOnly,
}

/// Operations page loads need from the inventory store.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    /// Short name shown in the connection status, e.g. `Supabase`.
    fn backend_name(&self) -> &'static str;

    /// Products ordered by SKU.
    async fn products(&self, scope: &Scope, filter: RecordFilter)
    -> Result<Vec<Product>, StoreError>;

    /// Storage locations ordered by name.
    async fn storages(
        &self,
        scope: &Scope,
        filter: RecordFilter,
    ) -> Result<Vec<StorageLocation>, StoreError>;

    /// Inventory report ordered by product name, then storage name.
    async fn inventory(&self, scope: &Scope) -> Result<Vec<InventoryRecord>, StoreError>;

    /// Persist a transfer and return the stored row.
    async fn record_transfer(
        &self,
        scope: &Scope,
        transfer: &NewTransfer,
    ) -> Result<Transfer, StoreError>;

    /// Cheap reachability check for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
