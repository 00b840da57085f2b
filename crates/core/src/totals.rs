//! Dashboard totals for a configured set of tracked SKUs.
//!
//! The business tracks a handful of flagship products on the dashboard.
//! Which SKUs those are is configuration ([`TrackedSkus`]); the summing is
//! a pure function over the inventory report ([`TrackedSkus::summarize`]).

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::{InventoryRecord, Sku, SkuError};

/// Key used for the grand total in serialized summaries.
pub const GRAND_TOTAL_KEY: &str = "total";

/// Errors that can occur when parsing a tracked-SKU list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackedSkusError {
    #[error("tracked SKU list is empty")]
    Empty,
    #[error("entry {0:?} must look like label=SKU")]
    MissingSeparator(String),
    #[error("entry {0:?} has an empty label")]
    EmptyLabel(String),
    #[error("label {0:?} is reserved for the grand total")]
    ReservedLabel(String),
    #[error("label {0:?} appears more than once")]
    DuplicateLabel(String),
    #[error("invalid SKU in entry {entry:?}: {source}")]
    InvalidSku { entry: String, source: SkuError },
}

/// One tracked product: the label shown on the dashboard and its SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSku {
    pub label: String,
    pub sku: Sku,
}

/// Ordered set of SKUs summed on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSkus(Vec<TrackedSku>);

impl TrackedSkus {
    /// Default mapping used when nothing is configured.
    pub const DEFAULT_MAPPING: &'static str = "liköer=SSL-001,klopfer=SSK-001";

    /// Parse a comma-separated `label=SKU` list, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackedSkusError`] for an empty list, a malformed entry, a
    /// duplicate label, the reserved label `total`, or an invalid SKU.
    pub fn parse(mapping: &str) -> Result<Self, TrackedSkusError> {
        let mut tracked: Vec<TrackedSku> = Vec::new();

        for entry in mapping.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (label, sku) = entry
                .split_once('=')
                .ok_or_else(|| TrackedSkusError::MissingSeparator(entry.to_string()))?;
            let label = label.trim();
            if label.is_empty() {
                return Err(TrackedSkusError::EmptyLabel(entry.to_string()));
            }
            if label.eq_ignore_ascii_case(GRAND_TOTAL_KEY) {
                return Err(TrackedSkusError::ReservedLabel(label.to_string()));
            }
            if tracked.iter().any(|t| t.label == label) {
                return Err(TrackedSkusError::DuplicateLabel(label.to_string()));
            }
            let sku = Sku::parse(sku).map_err(|source| TrackedSkusError::InvalidSku {
                entry: entry.to_string(),
                source,
            })?;
            tracked.push(TrackedSku {
                label: label.to_string(),
                sku,
            });
        }

        if tracked.is_empty() {
            return Err(TrackedSkusError::Empty);
        }
        Ok(Self(tracked))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedSku> {
        self.0.iter()
    }

    /// Sum quantities per tracked SKU and across all of them.
    ///
    /// Rows for untracked SKUs are ignored; a tracked SKU without rows
    /// totals zero.
    #[must_use]
    pub fn summarize(&self, inventory: &[InventoryRecord]) -> TotalsSummary {
        let per_sku: Vec<(String, u64)> = self
            .0
            .iter()
            .map(|tracked| {
                let sum = inventory
                    .iter()
                    .filter(|row| row.sku == tracked.sku)
                    .map(|row| u64::from(row.quantity))
                    .sum();
                (tracked.label.clone(), sum)
            })
            .collect();
        let total = per_sku.iter().map(|(_, n)| n).sum();

        TotalsSummary { per_sku, total }
    }
}

impl Default for TrackedSkus {
    fn default() -> Self {
        Self(vec![
            TrackedSku {
                label: "liköer".to_string(),
                sku: Sku::from_static("SSL-001"),
            },
            TrackedSku {
                label: "klopfer".to_string(),
                sku: Sku::from_static("SSK-001"),
            },
        ])
    }
}

/// Result of [`TrackedSkus::summarize`].
///
/// Serializes as a flat object, tracked labels in configured order followed
/// by `"total"`: `{"liköer": 7, "klopfer": 3, "total": 10}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsSummary {
    per_sku: Vec<(String, u64)>,
    total: u64,
}

impl TotalsSummary {
    /// Total for a tracked label, `None` if the label is not tracked.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<u64> {
        self.per_sku
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, n)| *n)
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    pub fn per_sku(&self) -> impl Iterator<Item = (&str, u64)> {
        self.per_sku.iter().map(|(l, n)| (l.as_str(), *n))
    }
}

impl Serialize for TotalsSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.per_sku.len() + 1))?;
        for (label, n) in &self.per_sku {
            map.serialize_entry(label, n)?;
        }
        map.serialize_entry(GRAND_TOTAL_KEY, &self.total)?;
        map.end()
    }
}
