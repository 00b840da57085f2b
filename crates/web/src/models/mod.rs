//! Request-scoped models.

pub mod session;

pub use session::{CurrentUser, StoredTokens, keys as session_keys};
