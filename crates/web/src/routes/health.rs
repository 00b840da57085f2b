//! Liveness and readiness checks.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness: the process is serving requests.
///
/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: the catalog store answers.
///
/// GET /health/ready
pub async fn ready(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(backend = state.store().backend_name(), error = %e, "Store not ready");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}
