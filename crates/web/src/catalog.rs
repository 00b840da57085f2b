//! Catalog loading for page requests.
//!
//! Every page reads the same three things in a fixed order: products,
//! storage locations, then the inventory report. The first failure stops the
//! sequence. Whatever loaded before it is kept, everything after it stays
//! empty, and the failure says which stage broke.
//!
//! Failures come in two kinds:
//!
//! - **Query failures** - the store answered with an error. The message names
//!   the table: `Failed to load storages: <cause>`.
//! - **Faults** - the store could not be reached, answered with something
//!   unreadable, or the adapter panicked. The message is
//!   `Connection failed: <cause>` and the connection status reports failure.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use stockroom_core::{InventoryRecord, Product, StorageLocation};

use crate::store::{CatalogStore, RecordFilter, Scope, StoreError};

/// One step of a catalog load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Products,
    Storages,
    Inventory,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Products => "products",
            Self::Storages => "storages",
            Self::Inventory => "inventory",
        })
    }
}

/// What a page needs loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPlan {
    /// Filter applied to products and storages.
    pub filter: RecordFilter,
    /// Whether the inventory report is read at all.
    pub include_inventory: bool,
}

impl LoadPlan {
    /// Dashboard and admin pages: everything.
    pub const FULL: Self = Self {
        filter: RecordFilter::All,
        include_inventory: true,
    };

    /// Transfer form: active products and storages, no inventory.
    pub const TRANSFER_FORM: Self = Self {
        filter: RecordFilter::ActiveOnly,
        include_inventory: false,
    };
}

/// The record sets a load produced. Unloaded sets are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub storages: Vec<StorageLocation>,
    pub inventory: Vec<InventoryRecord>,
}

/// Why a load stopped early.
#[derive(Debug)]
pub enum LoadFailure {
    /// The store rejected the query.
    Query { stage: Stage, error: StoreError },
    /// The store was unreachable or misbehaved.
    Fault { stage: Stage, cause: String },
}

impl LoadFailure {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Query { stage, .. } | Self::Fault { stage, .. } => *stage,
        }
    }

    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }

    /// Message shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Query { stage, error } => format!("Failed to load {stage}: {error}"),
            Self::Fault { cause, .. } => format!("Connection failed: {cause}"),
        }
    }
}

/// Result of a catalog load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Every planned stage succeeded.
    Complete(Catalog),
    /// `stage` failed; `catalog` holds the stages before it.
    Partial {
        stage: Stage,
        catalog: Catalog,
        failure: LoadFailure,
    },
}

impl LoadOutcome {
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        match self {
            Self::Complete(catalog) | Self::Partial { catalog, .. } => catalog,
        }
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&LoadFailure> {
        match self {
            Self::Complete(_) => None,
            Self::Partial { failure, .. } => Some(failure),
        }
    }

    /// Status line for the page. Absent when a query was rejected, since the
    /// store was evidently reachable but nothing can be claimed about it.
    #[must_use]
    pub fn connection_status(&self, backend: &str) -> Option<String> {
        match self {
            Self::Complete(_) => Some(format!("Connected to {backend}")),
            Self::Partial { failure, .. } if failure.is_fault() => {
                Some("Connection failed".to_string())
            }
            Self::Partial { .. } => None,
        }
    }

    #[must_use]
    pub fn into_catalog(self) -> Catalog {
        match self {
            Self::Complete(catalog) | Self::Partial { catalog, .. } => catalog,
        }
    }
}

/// Load the catalog described by `plan` as `scope`.
#[tracing::instrument(skip(store, scope), fields(backend = store.backend_name()))]
pub async fn load(store: &dyn CatalogStore, scope: &Scope, plan: LoadPlan) -> LoadOutcome {
    let mut catalog = Catalog::default();

    match guarded(Stage::Products, store.products(scope, plan.filter)).await {
        Ok(rows) => catalog.products = rows,
        Err(failure) => return partial(catalog, failure),
    }

    match guarded(Stage::Storages, store.storages(scope, plan.filter)).await {
        Ok(rows) => catalog.storages = rows,
        Err(failure) => return partial(catalog, failure),
    }

    if plan.include_inventory {
        match guarded(Stage::Inventory, store.inventory(scope)).await {
            Ok(rows) => catalog.inventory = rows,
            Err(failure) => return partial(catalog, failure),
        }
    }

    LoadOutcome::Complete(catalog)
}

fn partial(catalog: Catalog, failure: LoadFailure) -> LoadOutcome {
    if failure.is_fault() {
        tracing::error!(stage = %failure.stage(), error = %failure.message(), "Catalog load fault");
    } else {
        tracing::warn!(stage = %failure.stage(), error = %failure.message(), "Catalog query failed");
    }
    LoadOutcome::Partial {
        stage: failure.stage(),
        catalog,
        failure,
    }
}

/// Run one stage, turning errors and panics into a [`LoadFailure`].
async fn guarded<T>(
    stage: Stage,
    query: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, LoadFailure> {
    match AssertUnwindSafe(query).catch_unwind().await {
        Ok(Ok(rows)) => Ok(rows),
        Ok(Err(error)) if error.is_rejection() => Err(LoadFailure::Query { stage, error }),
        Ok(Err(error)) => Err(LoadFailure::Fault {
            stage,
            cause: error.to_string(),
        }),
        Err(payload) => Err(LoadFailure::Fault {
            stage,
            cause: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "store adapter panicked".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::AccessToken;
    use crate::store::fake::{Fault, FakeStore};

    fn scope() -> Scope {
        Scope::user(AccessToken::new("good-token"))
    }

    #[tokio::test]
    async fn test_complete_load() {
        let store = FakeStore::seeded();
        let outcome = load(&store, &scope(), LoadPlan::FULL).await;

        assert!(outcome.failure().is_none());
        assert_eq!(
            outcome.connection_status("Fake").as_deref(),
            Some("Connected to Fake")
        );
        let catalog = outcome.into_catalog();
        assert_eq!(catalog.products.len(), 3);
        assert_eq!(catalog.products[0].sku.as_str(), "SSK-001");
        assert_eq!(catalog.storages[0].name, "Altes Lager");
        assert_eq!(catalog.inventory.len(), 3);
        assert_eq!(catalog.inventory[0].product_name, "Klopfer");
        assert_eq!(store.calls(), (1, 1, 1));
        assert_eq!(store.last_token.lock().await.as_deref(), Some("good-token"));
    }

    #[tokio::test]
    async fn test_products_failure_stops_everything() {
        let store = FakeStore {
            products_fault: Fault::Reject("permission denied for table products"),
            ..FakeStore::seeded()
        };
        let outcome = load(&store, &scope(), LoadPlan::FULL).await;

        let LoadOutcome::Partial {
            stage,
            catalog,
            failure,
        } = outcome
        else {
            panic!("expected partial outcome");
        };
        assert_eq!(stage, Stage::Products);
        assert_eq!(catalog, Catalog::default());
        assert_eq!(
            failure.message(),
            "Failed to load products: permission denied for table products"
        );
        assert_eq!(store.calls(), (1, 0, 0));
    }

    #[tokio::test]
    async fn test_storages_failure_keeps_products() {
        let store = FakeStore {
            storages_fault: Fault::Reject("relation \"public.storages\" does not exist"),
            ..FakeStore::seeded()
        };
        let outcome = load(&store, &scope(), LoadPlan::FULL).await;

        assert!(outcome.connection_status("Fake").is_none());
        let message = outcome.failure().unwrap().message();
        assert!(message.starts_with("Failed to load storages:"));
        let catalog = outcome.catalog();
        assert_eq!(catalog.products.len(), 3);
        assert!(catalog.storages.is_empty());
        assert!(catalog.inventory.is_empty());
        assert_eq!(store.calls(), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_inventory_fault_is_connection_failure() {
        let store = FakeStore {
            inventory_fault: Fault::Garbage,
            ..FakeStore::seeded()
        };
        let outcome = load(&store, &scope(), LoadPlan::FULL).await;

        let failure = outcome.failure().unwrap();
        assert!(failure.is_fault());
        assert_eq!(failure.stage(), Stage::Inventory);
        assert!(failure.message().starts_with("Connection failed: "));
        assert_eq!(
            outcome.connection_status("Fake").as_deref(),
            Some("Connection failed")
        );
        assert_eq!(outcome.catalog().storages.len(), 3);
    }

    #[tokio::test]
    async fn test_adapter_panic_is_contained() {
        let store = FakeStore {
            storages_fault: Fault::Panic,
            ..FakeStore::seeded()
        };
        let outcome = load(&store, &scope(), LoadPlan::FULL).await;

        let failure = outcome.failure().unwrap();
        assert!(failure.is_fault());
        assert_eq!(
            failure.message(),
            "Connection failed: storages adapter blew up"
        );
        assert_eq!(outcome.catalog().products.len(), 3);
        assert_eq!(store.calls(), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_transfer_form_plan() {
        let store = FakeStore::seeded();
        let catalog = load(&store, &scope(), LoadPlan::TRANSFER_FORM)
            .await
            .into_catalog();

        assert!(catalog.products.iter().all(|p| p.active));
        assert_eq!(catalog.products.len(), 2);
        assert_eq!(catalog.storages.len(), 2);
        assert!(catalog.inventory.is_empty());
        assert_eq!(store.calls(), (1, 1, 0));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u8), "store adapter panicked");
    }
}
