//! Short-lived cache of validated access tokens.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::instrument;

use super::{
    AccessToken, AuthError, AuthSession, AuthUser, IdentityProvider, RefreshToken, SessionEvent,
    TokenKey,
};

/// Upper bound on distinct tokens remembered at once.
const MAX_CACHED_SESSIONS: u64 = 10_000;

/// How long the result of a refresh is handed to late callers holding the
/// same (now spent) refresh token.
const REFRESH_REUSE_WINDOW: Duration = Duration::from_secs(60);

/// Remembers which user a token resolved to for a few seconds, so a burst
/// of page loads does not round-trip to the provider each time.
///
/// Entries are keyed by token digest and expire after the configured TTL.
/// Sign-out events evict immediately.
///
/// Also makes refreshes single-flight: GoTrue rotates refresh tokens, so two
/// page loads racing on one expired session must share one exchange.
#[derive(Clone)]
pub struct SessionCache {
    users: Cache<TokenKey, AuthUser>,
    refreshed: Cache<TokenKey, AuthSession>,
}

impl SessionCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            users: Cache::builder()
                .max_capacity(MAX_CACHED_SESSIONS)
                .time_to_live(ttl)
                .build(),
            refreshed: Cache::builder()
                .max_capacity(MAX_CACHED_SESSIONS)
                .time_to_live(REFRESH_REUSE_WINDOW)
                .build(),
        }
    }

    /// Exchange a refresh token, at most once per token.
    ///
    /// Concurrent callers wait for the same provider call; callers within
    /// `REFRESH_REUSE_WINDOW` get its result. Failures are not remembered.
    ///
    /// # Errors
    ///
    /// Returns the provider failure, shared between the waiting callers.
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        identity: &dyn IdentityProvider,
        token: &RefreshToken,
    ) -> Result<AuthSession, Arc<AuthError>> {
        self.refreshed
            .try_get_with(token.cache_key(), identity.refresh(token))
            .await
    }

    /// Resolve a token, consulting the provider only on a cache miss.
    ///
    /// Only positive answers are cached; a rejected token is asked about
    /// again next time.
    ///
    /// # Errors
    ///
    /// Propagates provider failures unchanged.
    #[instrument(skip_all)]
    pub async fn resolve(
        &self,
        identity: &dyn IdentityProvider,
        token: &AccessToken,
    ) -> Result<Option<AuthUser>, AuthError> {
        let key = token.cache_key();
        if let Some(user) = self.users.get(&key).await {
            return Ok(Some(user));
        }

        let user = identity.get_session(token).await?;
        if let Some(user) = &user {
            self.users.insert(key, user.clone()).await;
        }
        Ok(user)
    }

    /// Apply one provider notification.
    pub async fn apply(&self, event: SessionEvent) {
        match event {
            SessionEvent::SignedIn { token, user } | SessionEvent::TokenRefreshed { token, user } => {
                self.users.insert(token, user).await;
            }
            SessionEvent::SignedOut { token } => {
                self.users.invalidate(&token).await;
            }
        }
    }

    /// Follow a provider's notifications until the provider goes away.
    ///
    /// If the listener falls behind, the whole cache is dropped: a missed
    /// sign-out must not leave a revoked token trusted until its TTL runs out.
    pub fn spawn_listener(&self, mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => cache.apply(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Session events lagged, clearing session cache");
                        cache.users.invalidate_all();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    #[cfg(test)]
    pub async fn contains(&self, token: &AccessToken) -> bool {
        self.users.get(&token.cache_key()).await.is_some()
    }
}
