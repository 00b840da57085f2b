//! Session gate.
//!
//! [`RequireSession`] resolves the signed-in staff member before a handler
//! runs. Requests without a valid session are redirected to `/login` with
//! 303 See Other and the handler never runs, so no store query is made.
//!
//! Resolution, in order:
//!
//! 1. Read the provider tokens from the cookie session.
//! 2. If the access token has expired, refresh it once (shared with any
//!    concurrent request holding the same tokens). A failed refresh signs
//!    the browser out.
//! 3. Ask the identity provider who the token belongs to (through the
//!    short-lived [`crate::identity::SessionCache`]).
//!
//! Provider outages are logged and treated as "no session".

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::identity::AuthSession;
use crate::models::{CurrentUser, StoredTokens, session_keys};
use crate::state::AppState;

/// Path unauthenticated page loads are sent to.
pub const LOGIN_PATH: &str = "/login";

/// Extractor that requires a signed-in staff member.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession(current): RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", current.user.email)
/// }
/// ```
pub struct RequireSession(pub CurrentUser);

/// Returned when a page needs a session and there is none.
#[derive(Debug)]
pub struct SessionRejection;

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = SessionRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(SessionRejection)?;

        let mut tokens: StoredTokens = match session.get(session_keys::TOKENS).await {
            Ok(Some(tokens)) => tokens,
            Ok(None) => return Err(SessionRejection),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session");
                return Err(SessionRejection);
            }
        };

        if tokens.is_expired() {
            match state
                .sessions()
                .refresh(state.identity(), &tokens.refresh_token())
                .await
            {
                Ok(refreshed) => {
                    tokens = StoredTokens::from(&refreshed);
                    if let Err(e) = session.insert(session_keys::TOKENS, &tokens).await {
                        tracing::warn!(error = %e, "Failed to store refreshed tokens");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session refresh failed, signing out");
                    let _ = clear_tokens(&session).await;
                    return Err(SessionRejection);
                }
            }
        }

        let access_token = tokens.access_token();
        match state
            .sessions()
            .resolve(state.identity(), &access_token)
            .await
        {
            Ok(Some(user)) => {
                set_sentry_user(&user);
                Ok(Self(CurrentUser { user, access_token }))
            }
            Ok(None) => {
                tracing::debug!("Provider no longer accepts session token");
                let _ = clear_tokens(&session).await;
                Err(SessionRejection)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Identity provider unavailable, failing closed");
                Err(SessionRejection)
            }
        }
    }
}

/// Helper to store a fresh provider session (login).
///
/// Cycles the session id first so a pre-login cookie cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_tokens(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::TOKENS, StoredTokens::from(auth))
        .await
}

/// Helper to read the stored tokens without validating them (logout).
pub async fn stored_tokens(session: &Session) -> Option<StoredTokens> {
    session.get(session_keys::TOKENS).await.ok().flatten()
}

/// Helper to clear the provider tokens from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_tokens(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<StoredTokens>(session_keys::TOKENS).await?;
    Ok(())
}
