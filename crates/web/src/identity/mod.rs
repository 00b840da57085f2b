//! Identity provider seam.
//!
//! Stockroom never stores passwords or user rows itself; sign-in, sign-up,
//! token validation and sign-out are delegated to an [`IdentityProvider`]
//! (Supabase GoTrue in production, see [`crate::supabase::GoTrueClient`]).
//!
//! # Session changes
//!
//! Providers publish [`SessionEvent`]s on a broadcast channel whenever they
//! mint, refresh or revoke a token. The only subscriber is the
//! [`SessionCache`], which uses them to keep its short-lived view of
//! validated tokens in step. There is deliberately no process-wide
//! "current user": every request carries its own tokens in its cookie
//! session and is resolved on its own.

mod cache;
#[cfg(test)]
pub mod fake;

pub use cache::SessionCache;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stockroom_core::{Email, EmailError};
use thiserror::Error;
use tokio::sync::broadcast;
use url::Url;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Wrong email/password, or an invalid/expired refresh token.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-up for an address that already has an account.
    #[error("user already registered")]
    UserAlreadyExists,

    /// Password rejected by the provider's password policy.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    /// Email address failed local validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Provider answered with an error we have no specific mapping for.
    #[error("identity provider rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Provider answered with a body we could not understand.
    #[error("unexpected identity provider response: {0}")]
    Decode(String),

    /// Endpoint URL could not be built from the configured project URL.
    #[error("invalid identity endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Bearer token proving a signed-in user.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Digest used wherever a token has to be remembered (cache keys, events).
    #[must_use]
    pub fn cache_key(&self) -> TokenKey {
        TokenKey::digest(self.expose())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Long-lived token exchanged for a fresh [`AccessToken`].
#[derive(Clone)]
pub struct RefreshToken(SecretString);

impl RefreshToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    #[must_use]
    pub fn cache_key(&self) -> TokenKey {
        TokenKey::digest(self.expose())
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshToken([REDACTED])")
    }
}

/// SHA-256 hex digest of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey(String);

impl TokenKey {
    fn digest(token: &str) -> Self {
        Self(hex::encode(Sha256::digest(token.as_bytes())))
    }
}

/// The user a valid token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider-assigned user id (a UUID for Supabase).
    pub id: String,
    pub email: Email,
}

/// Tokens plus the user they were issued to.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    /// Unix timestamp when the access token expires.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    /// Seconds before expiry at which a token is already treated as expired.
    pub const EXPIRY_MARGIN_SECS: i64 = 30;

    /// Check if the access token has expired (or is about to).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        is_expired_at(self.expires_at, chrono::Utc::now().timestamp())
    }
}

/// Shared expiry rule for live sessions and tokens read back from cookies.
#[must_use]
pub const fn is_expired_at(expires_at: i64, now: i64) -> bool {
    now >= expires_at - AuthSession::EXPIRY_MARGIN_SECS
}

/// Extra sign-up settings.
#[derive(Debug, Clone, Default)]
pub struct SignUpOptions {
    /// Where the confirmation email should send the user.
    pub email_redirect_to: Option<Url>,
}

/// What a successful sign-up produced.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The provider auto-confirms addresses and issued a session right away.
    SignedIn(AuthSession),
    /// A confirmation email was sent; the user must follow it before signing in.
    ConfirmationSent(AuthUser),
}

/// Session changes published by a provider.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn {
        token: TokenKey,
        user: AuthUser,
    },
    TokenRefreshed {
        token: TokenKey,
        user: AuthUser,
    },
    SignedOut {
        token: TokenKey,
    },
}

/// Operations Stockroom consumes from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolve the user behind an access token.
    ///
    /// `Ok(None)` means the provider does not accept the token (expired,
    /// revoked, unknown). `Err` means the provider could not be asked.
    async fn get_session(&self, token: &AccessToken) -> Result<Option<AuthUser>, AuthError>;

    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<AuthSession, AuthError>;

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        options: SignUpOptions,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn refresh(&self, token: &RefreshToken) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthError>;

    /// Subscribe to session changes made through this provider.
    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_digest() {
        let a = AccessToken::new("token-a");
        assert_eq!(a.cache_key(), AccessToken::new("token-a").cache_key());
        assert_ne!(a.cache_key(), AccessToken::new("token-b").cache_key());
        assert_eq!(a.cache_key().0.len(), 64);
        assert!(!a.cache_key().0.contains("token-a"));
    }

    #[test]
    fn test_expiry_margin() {
        let now = 1_700_000_000;
        assert!(is_expired_at(now - 10, now));
        assert!(is_expired_at(now + 10, now));
        assert!(!is_expired_at(now + 3600, now));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", AccessToken::new("very-secret"));
        assert!(!debug.contains("very-secret"));
        let debug = format!("{:?}", RefreshToken::new("also-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
