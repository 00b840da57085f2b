//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (pings the catalog store)
//!
//! # Auth (public)
//! GET  /login                  - Login page
//! POST /login                  - Sign in with email and password
//! POST /signup                 - Create an account (confirmation email)
//! POST /logout                 - Sign out
//!
//! # Pages (session required, JSON page data)
//! GET  /                       - Dashboard: catalog plus stock totals
//! GET  /admin                  - Admin overview: full catalog
//! GET  /transfer               - Transfer form data: active records only
//! POST /transfer               - Record a transfer
//! ```
//!
//! Page handlers take [`crate::middleware::RequireSession`], so an
//! unauthenticated request is redirected before any store query runs.

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod page;
pub mod transfer;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::create_session_layer;
use crate::state::AppState;

pub use page::PageData;

/// Build the route table.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health checks
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", post(auth::signup))
        .route("/logout", post(auth::logout))
        // Pages
        .route("/", get(dashboard::dashboard))
        .route("/admin", get(admin::admin))
        .route(
            "/transfer",
            get(transfer::transfer_form).post(transfer::record_transfer),
        )
}

/// The full application: routes, cookie sessions and request tracing.
pub fn app(state: AppState) -> Router {
    layered(routes(), state)
}

fn layered(router: Router<AppState>, state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    router
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
