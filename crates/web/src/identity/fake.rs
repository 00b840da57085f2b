//! In-memory identity provider for tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use stockroom_core::Email;
use tokio::sync::broadcast;

use super::{
    AccessToken, AuthError, AuthSession, AuthUser, IdentityProvider, RefreshToken, SessionEvent,
    SignUpOptions, SignUpOutcome,
};

pub const FAKE_PASSWORD: &str = "correct horse battery staple";

/// Accepts one fixed password and a configurable set of tokens.
pub struct FakeIdentity {
    tokens: Mutex<HashMap<String, AuthUser>>,
    refresh_tokens: Mutex<HashMap<String, AuthUser>>,
    events: broadcast::Sender<SessionEvent>,
    /// Set to make every call fail as if the provider were unreachable.
    pub unavailable: bool,
    pub get_session_calls: AtomicU64,
    pub sign_up_calls: AtomicU64,
    pub refresh_calls: AtomicU64,
    pub sign_out_calls: AtomicU64,
    pub last_sign_up_redirect: Mutex<Option<String>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            tokens: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            events,
            unavailable: false,
            get_session_calls: AtomicU64::new(0),
            sign_up_calls: AtomicU64::new(0),
            refresh_calls: AtomicU64::new(0),
            sign_out_calls: AtomicU64::new(0),
            last_sign_up_redirect: Mutex::new(None),
        }
    }

    /// Provider that knows one user holding `token`.
    pub fn with_user(email: &str, token: &str) -> Self {
        let identity = Self::new();
        identity
            .tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), user(email));
        identity
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    /// Accept `refresh` for `email`.
    pub fn add_refresh_token(&self, refresh: &str, email: &str) {
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh.to_string(), user(email));
    }

    fn offline(&self) -> Result<(), AuthError> {
        if self.unavailable {
            return Err(AuthError::Rejected {
                status: 503,
                message: "identity provider unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn issue(&self, user: AuthUser) -> AuthSession {
        let n = self.tokens.lock().unwrap().len();
        let access = format!("access-{n}-{}", user.id);
        let refresh = format!("refresh-{n}-{}", user.id);
        self.tokens
            .lock()
            .unwrap()
            .insert(access.clone(), user.clone());
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh.clone(), user.clone());
        AuthSession {
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(refresh),
            expires_at: chrono::Utc::now().timestamp() + 3600,
            user,
        }
    }
}

fn user(email: &str) -> AuthUser {
    AuthUser {
        id: format!("user-{email}"),
        email: Email::parse(email).unwrap(),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_session(&self, token: &AccessToken) -> Result<Option<AuthUser>, AuthError> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        self.offline()?;
        Ok(self.tokens.lock().unwrap().get(token.expose()).cloned())
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        self.offline()?;
        if password.expose_secret() != FAKE_PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        let session = self.issue(user(email.as_str()));
        let _ = self.events.send(SessionEvent::SignedIn {
            token: session.access_token.cache_key(),
            user: session.user.clone(),
        });
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &Email,
        _password: &SecretString,
        options: SignUpOptions,
    ) -> Result<SignUpOutcome, AuthError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.offline()?;
        *self.last_sign_up_redirect.lock().unwrap() =
            options.email_redirect_to.map(|u| u.to_string());
        Ok(SignUpOutcome::ConfirmationSent(user(email.as_str())))
    }

    async fn refresh(&self, token: &RefreshToken) -> Result<AuthSession, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.offline()?;
        let known = self.refresh_tokens.lock().unwrap().remove(token.expose());
        let user = known.ok_or(AuthError::InvalidCredentials)?;
        let session = self.issue(user);
        let _ = self.events.send(SessionEvent::TokenRefreshed {
            token: session.access_token.cache_key(),
            user: session.user.clone(),
        });
        Ok(session)
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.offline()?;
        self.tokens.lock().unwrap().remove(token.expose());
        let _ = self.events.send(SessionEvent::SignedOut {
            token: token.cache_key(),
        });
        Ok(())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
