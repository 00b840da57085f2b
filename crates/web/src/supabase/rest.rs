//! PostgREST catalog store.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use tracing::instrument;

use stockroom_core::{InventoryRecord, NewTransfer, Product, StorageLocation, Transfer};

use super::{ErrorBody, authorize, http_client};
use crate::config::SupabaseConfig;
use crate::store::{
    CatalogStore, INVENTORY_VIEW, PRODUCTS_TABLE, RecordFilter, STORAGES_TABLE, Scope, StoreError,
    TRANSFERS_TABLE,
};

// =============================================================================
// Query Builder
// =============================================================================

/// A PostgREST read: `select(columns).eq(field, value)*.order_by(fields)`.
///
/// Rendered as query parameters, e.g.
/// `?select=*&active=eq.true&order=sku.asc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    table: &'static str,
    columns: &'static str,
    filters: Vec<(&'static str, String)>,
    order: Vec<&'static str>,
    limit: Option<u32>,
}

impl Select {
    /// Select all columns of `table`.
    #[must_use]
    pub const fn from(table: &'static str) -> Self {
        Self {
            table,
            columns: "*",
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub const fn columns(mut self, columns: &'static str) -> Self {
        self.columns = columns;
        self
    }

    /// Keep rows where `field` equals `value`.
    #[must_use]
    pub fn eq(mut self, field: &'static str, value: impl Display) -> Self {
        self.filters.push((field, format!("eq.{value}")));
        self
    }

    /// Sort ascending by `fields`, in order.
    #[must_use]
    pub fn order_by(mut self, fields: &[&'static str]) -> Self {
        self.order.extend_from_slice(fields);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply a [`RecordFilter`] to a table with an `active` column.
    #[must_use]
    pub fn filtered(self, filter: RecordFilter) -> Self {
        match filter {
            RecordFilter::All => self,
            RecordFilter::ActiveOnly => self.eq("active", true),
        }
    }

    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// Query parameters in PostgREST syntax.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.to_string())];
        pairs.extend(
            self.filters
                .iter()
                .map(|(field, value)| ((*field).to_string(), value.clone())),
        );
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|field| format!("{field}.asc"))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

// =============================================================================
// Store
// =============================================================================

/// [`CatalogStore`] over the project's PostgREST API.
#[derive(Clone)]
pub struct PostgrestStore {
    inner: Arc<PostgrestStoreInner>,
}

struct PostgrestStoreInner {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl PostgrestStore {
    /// Create a store for the project in `config`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Http` if the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        Ok(Self {
            inner: Arc::new(PostgrestStoreInner {
                client: http_client()?,
                config,
            }),
        })
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        scope: &Scope,
    ) -> Result<reqwest::RequestBuilder, StoreError> {
        let url = self.inner.config.endpoint(&format!("rest/v1/{table}"))?;
        let request = self
            .inner
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        Ok(authorize(
            request,
            &self.inner.config,
            scope.access_token().map(|t| t.expose()),
        ))
    }

    /// Run a read and decode the rows.
    async fn fetch<T: DeserializeOwned + Send>(
        &self,
        scope: &Scope,
        select: &Select,
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .request(Method::GET, select.table(), scope)?
            .query(&select.query_pairs())
            .send()
            .await?;

        Ok(checked(response).await?.json().await?)
    }
}

/// Turn a non-2xx PostgREST answer into [`StoreError::Rejected`].
async fn checked(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    let body = ErrorBody::parse(&raw);
    Err(StoreError::Rejected {
        status: Some(status.as_u16()),
        code: body.code(),
        message: body.message(),
    })
}

#[async_trait]
impl CatalogStore for PostgrestStore {
    fn backend_name(&self) -> &'static str {
        "Supabase"
    }

    #[instrument(skip(self, scope))]
    async fn products(
        &self,
        scope: &Scope,
        filter: RecordFilter,
    ) -> Result<Vec<Product>, StoreError> {
        let select = Select::from(PRODUCTS_TABLE)
            .filtered(filter)
            .order_by(&["sku"]);
        self.fetch(scope, &select).await
    }

    #[instrument(skip(self, scope))]
    async fn storages(
        &self,
        scope: &Scope,
        filter: RecordFilter,
    ) -> Result<Vec<StorageLocation>, StoreError> {
        let select = Select::from(STORAGES_TABLE)
            .filtered(filter)
            .order_by(&["name"]);
        self.fetch(scope, &select).await
    }

    #[instrument(skip(self, scope))]
    async fn inventory(&self, scope: &Scope) -> Result<Vec<InventoryRecord>, StoreError> {
        let select = Select::from(INVENTORY_VIEW).order_by(&["product_name", "storage_name"]);
        self.fetch(scope, &select).await
    }

    #[instrument(skip(self, scope, transfer), fields(product_id = %transfer.product_id()))]
    async fn record_transfer(
        &self,
        scope: &Scope,
        transfer: &NewTransfer,
    ) -> Result<Transfer, StoreError> {
        let response = self
            .request(Method::POST, TRANSFERS_TABLE, scope)?
            .header("Prefer", "return=representation")
            .json(transfer)
            .send()
            .await?;

        let rows: Vec<Transfer> = checked(response).await?.json().await?;
        rows.into_iter().next().ok_or(StoreError::Malformed {
            table: TRANSFERS_TABLE,
            reason: "insert returned no row".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let select = Select::from(PRODUCTS_TABLE).columns("id").limit(1);
        let response = self
            .request(Method::GET, select.table(), &Scope::anonymous())?
            .query(&select.query_pairs())
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }
}
