//! Catalog records read from (and written to) the inventory store.
//!
//! Field names match the store's columns so rows deserialize directly and
//! page data keeps the same shape the UI already renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Email, ProductId, Quantity, Sku, StorageId, TransferId};

/// A product that can be stocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// A named place where stock is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub id: StorageId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// One row of the `inventory_report` view: stock of one product at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: Sku,
    pub product_name: String,
    pub storage_name: String,
    pub quantity: Quantity,
}

/// A stored movement of stock between two locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub product_id: ProductId,
    pub from_storage_id: StorageId,
    pub to_storage_id: StorageId,
    pub quantity: Quantity,
    pub user_email: Email,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reasons a transfer request is refused before reaching the store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer quantity must be at least 1")]
    ZeroQuantity,
    #[error("source and destination storage must differ")]
    SameStorage,
    #[error("notes must be at most {max} characters")]
    NotesTooLong { max: usize },
}

/// A validated transfer ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTransfer {
    product_id: ProductId,
    from_storage_id: StorageId,
    to_storage_id: StorageId,
    quantity: Quantity,
    user_email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl NewTransfer {
    pub const MAX_NOTES_LENGTH: usize = 500;

    /// Validate and build a transfer attributed to `user_email`.
    ///
    /// Blank notes are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] when the quantity is zero, both locations
    /// are the same, or the notes are too long.
    pub fn new(
        product_id: ProductId,
        from_storage_id: StorageId,
        to_storage_id: StorageId,
        quantity: Quantity,
        user_email: Email,
        notes: Option<String>,
    ) -> Result<Self, TransferError> {
        if quantity.is_zero() {
            return Err(TransferError::ZeroQuantity);
        }
        if from_storage_id == to_storage_id {
            return Err(TransferError::SameStorage);
        }
        let notes = notes
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        if notes
            .as_ref()
            .is_some_and(|n| n.chars().count() > Self::MAX_NOTES_LENGTH)
        {
            return Err(TransferError::NotesTooLong {
                max: Self::MAX_NOTES_LENGTH,
            });
        }

        Ok(Self {
            product_id,
            from_storage_id,
            to_storage_id,
            quantity,
            user_email,
            notes,
        })
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    #[must_use]
    pub const fn from_storage_id(&self) -> StorageId {
        self.from_storage_id
    }

    #[must_use]
    pub const fn to_storage_id(&self) -> StorageId {
        self.to_storage_id
    }

    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    #[must_use]
    pub const fn user_email(&self) -> &Email {
        &self.user_email
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

const fn default_active() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("lager@example.com").unwrap()
    }

    #[test]
    fn test_inventory_record_from_store_row() {
        let row = r#"{"sku":"SSL-001","product_name":"Liköer","storage_name":"Keller","quantity":5,"extra":1}"#;
        let record: InventoryRecord = serde_json::from_str(row).unwrap();
        assert_eq!(record.sku.as_str(), "SSL-001");
        assert_eq!(record.quantity, Quantity::new(5));
    }

    #[test]
    fn test_product_active_defaults_to_true() {
        let product: Product =
            serde_json::from_str(r#"{"id":1,"sku":"SSK-001","name":"Klopfer"}"#).unwrap();
        assert!(product.active);
    }

    #[test]
    fn test_new_transfer_rejects_zero_and_same_storage() {
        let zero = NewTransfer::new(
            ProductId::new(1),
            StorageId::new(1),
            StorageId::new(2),
            Quantity::ZERO,
            email(),
            None,
        );
        assert_eq!(zero, Err(TransferError::ZeroQuantity));

        let same = NewTransfer::new(
            ProductId::new(1),
            StorageId::new(3),
            StorageId::new(3),
            Quantity::new(2),
            email(),
            None,
        );
        assert_eq!(same, Err(TransferError::SameStorage));
    }

    #[test]
    fn test_new_transfer_drops_blank_notes() {
        let transfer = NewTransfer::new(
            ProductId::new(1),
            StorageId::new(1),
            StorageId::new(2),
            Quantity::new(4),
            email(),
            Some("   ".to_string()),
        )
        .unwrap();
        assert_eq!(transfer.notes(), None);

        let json = serde_json::to_value(&transfer).unwrap();
        assert_eq!(json["quantity"], 4);
        assert_eq!(json["user_email"], "lager@example.com");
        assert!(json.get("notes").is_none());
    }
}
