//! Session-related types for staff authentication.
//!
//! Types stored in the cookie session for authentication state.

use serde::{Deserialize, Serialize};

use crate::identity::{AccessToken, AuthSession, AuthUser, RefreshToken, is_expired_at};

/// Provider tokens kept in the session store.
///
/// Plain strings because the session store serializes them; they never
/// leave the server-side store.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    access_token: String,
    refresh_token: String,
    /// Unix timestamp when the access token expires.
    pub expires_at: i64,
}

impl StoredTokens {
    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> RefreshToken {
        RefreshToken::new(self.refresh_token.clone())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        is_expired_at(self.expires_at, chrono::Utc::now().timestamp())
    }
}

impl From<&AuthSession> for StoredTokens {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.expose().to_string(),
            refresh_token: session.refresh_token.expose().to_string(),
            expires_at: session.expires_at,
        }
    }
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The signed-in staff member, as handed to gated handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    /// Token to run store queries as.
    pub access_token: AccessToken,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the provider tokens of the signed-in user.
    pub const TOKENS: &str = "supabase_tokens";

    /// Key for a one-shot message shown on the login page.
    pub const LOGIN_NOTICE: &str = "login_notice";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_tokens_debug_redacts() {
        let tokens = StoredTokens {
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at: 42,
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
        assert!(tokens.is_expired());
    }

    #[test]
    fn test_stored_tokens_round_trip_through_session_json() {
        let tokens = StoredTokens {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: chrono::Utc::now().timestamp() + 3600,
        };
        let json = serde_json::to_value(&tokens).unwrap();
        let back: StoredTokens = serde_json::from_value(json).unwrap();
        assert_eq!(back.access_token().expose(), "a");
        assert!(!back.is_expired());
    }
}
