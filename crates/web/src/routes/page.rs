//! JSON page data shared by the gated pages.

use serde::Serialize;
use stockroom_core::{Email, TotalsSummary};

use crate::catalog::{Catalog, LoadOutcome};

/// Data a page renders from.
///
/// `products`, `storages` and `inventory` are always present (empty when
/// not loaded); the rest is omitted when absent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    #[serde(flatten)]
    pub catalog: Catalog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<TotalsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<Email>,
}

impl PageData {
    /// Page data for a load outcome, with the status line for `backend`.
    #[must_use]
    pub fn from_outcome(outcome: LoadOutcome, backend: &str) -> Self {
        let connection_status = outcome.connection_status(backend);
        let error = outcome.failure().map(crate::catalog::LoadFailure::message);
        Self {
            catalog: outcome.into_catalog(),
            totals: None,
            error,
            connection_status,
            user_email: None,
        }
    }

    #[must_use]
    pub fn with_totals(mut self, totals: Option<TotalsSummary>) -> Self {
        self.totals = totals;
        self
    }

    #[must_use]
    pub fn with_user_email(mut self, email: Email) -> Self {
        self.user_email = Some(email);
        self
    }
}
