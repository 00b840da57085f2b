//! Core types for Stockroom.
//!
//! This module provides type-safe wrappers for the inventory domain.

pub mod catalog;
pub mod email;
pub mod id;
pub mod quantity;
pub mod sku;

pub use catalog::{InventoryRecord, NewTransfer, Product, StorageLocation, Transfer, TransferError};
pub use email::{Email, EmailError};
pub use id::*;
pub use quantity::{Quantity, QuantityError};
pub use sku::{Sku, SkuError};
