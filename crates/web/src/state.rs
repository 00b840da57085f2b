//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::identity::{IdentityProvider, SessionCache};
use crate::store::CatalogStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// identity provider, the catalog store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn CatalogStore>,
    sessions: SessionCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Subscribes the session cache to the provider's session changes; must
    /// be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        let sessions = SessionCache::new(config.session_cache_ttl);
        sessions.spawn_listener(identity.on_session_change());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                store,
                sessions,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the catalog store.
    #[must_use]
    pub fn store(&self) -> &dyn CatalogStore {
        self.inner.store.as_ref()
    }

    /// Get the validated-session cache.
    #[must_use]
    pub fn sessions(&self) -> &SessionCache {
        &self.inner.sessions
    }
}
