//! HTTP middleware for the web server.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing with status and latency)
//! 3. Session layer (tower-sessions, in-memory store)
//! 4. Session gate (per-handler [`RequireSession`] extractor)

pub mod auth;
pub mod session;

pub use auth::{LOGIN_PATH, RequireSession, clear_tokens, set_tokens, stored_tokens};
pub use session::create_session_layer;
