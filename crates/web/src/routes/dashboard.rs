//! Dashboard: full catalog plus stock totals.

use axum::{Json, extract::State};
use tracing::instrument;

use super::page::PageData;
use crate::catalog::{self, LoadOutcome, LoadPlan};
use crate::middleware::RequireSession;
use crate::state::AppState;
use crate::store::Scope;

/// Dashboard page data.
///
/// GET /
///
/// Totals are only computed when every stage loaded; a partial inventory
/// would produce misleading sums.
#[instrument(skip_all, fields(user = %current.user.email))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireSession(current): RequireSession,
) -> Json<PageData> {
    let scope = Scope::user(current.access_token);
    let outcome = catalog::load(state.store(), &scope, LoadPlan::FULL).await;

    let totals = match &outcome {
        LoadOutcome::Complete(catalog) => {
            Some(state.config().tracked_skus.summarize(&catalog.inventory))
        }
        LoadOutcome::Partial { .. } => None,
    };

    Json(
        PageData::from_outcome(outcome, state.store().backend_name())
            .with_totals(totals)
            .with_user_email(current.user.email),
    )
}
