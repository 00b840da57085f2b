//! In-memory catalog store for tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use stockroom_core::{
    InventoryRecord, NewTransfer, Product, ProductId, Quantity, Sku, StorageId,
    StorageLocation, Transfer, TransferId,
};
use tokio::sync::Mutex;

use super::{CatalogStore, RecordFilter, Scope, StoreError};

/// How a fake query should misbehave.
#[derive(Debug, Clone, Default)]
pub enum Fault {
    #[default]
    None,
    /// Store answers with an error message.
    Reject(&'static str),
    /// Store answers with a row that does not decode.
    Garbage,
    /// Adapter panics mid-query.
    Panic,
}

impl Fault {
    fn trip(&self, table: &'static str) -> Result<(), StoreError> {
        match self {
            Self::None => Ok(()),
            Self::Reject(message) => Err(StoreError::Rejected {
                status: Some(400),
                code: None,
                message: (*message).to_string(),
            }),
            Self::Garbage => Err(StoreError::Malformed {
                table,
                reason: "quantity: invalid type: string \"lots\", expected u32".to_string(),
            }),
            Self::Panic => panic!("{table} adapter blew up"),
        }
    }
}

pub struct FakeStore {
    pub products: Mutex<Vec<Product>>,
    pub storages: Mutex<Vec<StorageLocation>>,
    pub inventory: Mutex<Vec<InventoryRecord>>,
    pub transfers: Mutex<Vec<Transfer>>,
    pub products_fault: Fault,
    pub storages_fault: Fault,
    pub inventory_fault: Fault,
    pub products_calls: AtomicU64,
    pub storages_calls: AtomicU64,
    pub inventory_calls: AtomicU64,
    pub transfer_calls: AtomicU64,
    pub last_token: Mutex<Option<String>>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            products: Mutex::new(Vec::new()),
            storages: Mutex::new(Vec::new()),
            inventory: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
            products_fault: Fault::None,
            storages_fault: Fault::None,
            inventory_fault: Fault::None,
            products_calls: AtomicU64::new(0),
            storages_calls: AtomicU64::new(0),
            inventory_calls: AtomicU64::new(0),
            transfer_calls: AtomicU64::new(0),
            last_token: Mutex::new(None),
        }
    }
}

impl FakeStore {
    /// Three products and three locations (one of each inactive) and a
    /// report holding `SSL-001: 5, SSK-001: 3, SSL-001: 2`.
    pub fn seeded() -> Self {
        let store = Self::default();
        *store.products.try_lock().unwrap() = vec![
            product(1, "SSK-001", "Klopfer", true),
            product(2, "SSL-001", "Liköer", true),
            product(3, "XXL-999", "Discontinued", false),
        ];
        *store.storages.try_lock().unwrap() = vec![
            storage(1, "Keller", true),
            storage(2, "Laden", true),
            storage(3, "Altes Lager", false),
        ];
        *store.inventory.try_lock().unwrap() = vec![
            record("SSL-001", "Liköer", "Keller", 5),
            record("SSK-001", "Klopfer", "Keller", 3),
            record("SSL-001", "Liköer", "Laden", 2),
        ];
        store
    }

    pub fn calls(&self) -> (u64, u64, u64) {
        (
            self.products_calls.load(Ordering::SeqCst),
            self.storages_calls.load(Ordering::SeqCst),
            self.inventory_calls.load(Ordering::SeqCst),
        )
    }

    async fn remember(&self, scope: &Scope) {
        *self.last_token.lock().await = scope.access_token().map(|t| t.expose().to_string());
    }
}

pub fn product(id: i64, sku: &str, name: &str, active: bool) -> Product {
    Product {
        id: ProductId::new(id),
        sku: Sku::parse(sku).unwrap(),
        name: name.to_string(),
        active,
    }
}

pub fn storage(id: i64, name: &str, active: bool) -> StorageLocation {
    StorageLocation {
        id: StorageId::new(id),
        name: name.to_string(),
        active,
    }
}

pub fn record(sku: &str, product_name: &str, storage_name: &str, qty: u32) -> InventoryRecord {
    InventoryRecord {
        sku: Sku::parse(sku).unwrap(),
        product_name: product_name.to_string(),
        storage_name: storage_name.to_string(),
        quantity: Quantity::new(qty),
    }
}

#[async_trait]
impl CatalogStore for FakeStore {
    fn backend_name(&self) -> &'static str {
        "Fake"
    }

    async fn products(
        &self,
        scope: &Scope,
        filter: RecordFilter,
    ) -> Result<Vec<Product>, StoreError> {
        self.products_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(scope).await;
        self.products_fault.trip(super::PRODUCTS_TABLE)?;
        let mut rows: Vec<Product> = self
            .products
            .lock()
            .await
            .iter()
            .filter(|p| filter == RecordFilter::All || p.active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(rows)
    }

    async fn storages(
        &self,
        scope: &Scope,
        filter: RecordFilter,
    ) -> Result<Vec<StorageLocation>, StoreError> {
        self.storages_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(scope).await;
        self.storages_fault.trip(super::STORAGES_TABLE)?;
        let mut rows: Vec<StorageLocation> = self
            .storages
            .lock()
            .await
            .iter()
            .filter(|s| filter == RecordFilter::All || s.active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn inventory(&self, scope: &Scope) -> Result<Vec<InventoryRecord>, StoreError> {
        self.inventory_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(scope).await;
        self.inventory_fault.trip(super::INVENTORY_VIEW)?;
        let mut rows = self.inventory.lock().await.clone();
        rows.sort_by(|a, b| {
            (&a.product_name, &a.storage_name).cmp(&(&b.product_name, &b.storage_name))
        });
        Ok(rows)
    }

    async fn record_transfer(
        &self,
        scope: &Scope,
        transfer: &NewTransfer,
    ) -> Result<Transfer, StoreError> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(scope).await;
        let mut transfers = self.transfers.lock().await;
        let stored = Transfer {
            id: TransferId::new(i64::try_from(transfers.len()).unwrap() + 1),
            product_id: transfer.product_id(),
            from_storage_id: transfer.from_storage_id(),
            to_storage_id: transfer.to_storage_id(),
            quantity: transfer.quantity(),
            user_email: transfer.user_email().clone(),
            notes: transfer.notes().map(str::to_string),
            created_at: chrono::Utc::now(),
        };
        transfers.push(stored.clone());
        Ok(stored)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.products_fault.trip(super::PRODUCTS_TABLE)
    }
}
