//! Admin overview: every product, location and stock row.

use axum::{Json, extract::State};
use tracing::instrument;

use super::page::PageData;
use crate::catalog::{self, LoadPlan};
use crate::middleware::RequireSession;
use crate::state::AppState;
use crate::store::Scope;

/// Admin page data.
///
/// GET /admin
#[instrument(skip_all, fields(user = %current.user.email))]
pub async fn admin(
    State(state): State<AppState>,
    RequireSession(current): RequireSession,
) -> Json<PageData> {
    let scope = Scope::user(current.access_token);
    let outcome = catalog::load(state.store(), &scope, LoadPlan::FULL).await;

    Json(
        PageData::from_outcome(outcome, state.store().backend_name())
            .with_user_email(current.user.email),
    )
}
