//! GoTrue (Supabase Auth) client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use stockroom_core::Email;
use tokio::sync::broadcast;
use tracing::instrument;
use url::Url;

use super::{ErrorBody, authorize, http_client};
use crate::config::SupabaseConfig;
use crate::identity::{
    AccessToken, AuthError, AuthSession, AuthUser, IdentityProvider, RefreshToken, SessionEvent,
    SignUpOptions, SignUpOutcome,
};

/// Pending notifications kept for slow subscribers.
const EVENT_CAPACITY: usize = 64;

/// [`IdentityProvider`] backed by a Supabase project's GoTrue service.
#[derive(Clone)]
pub struct GoTrueClient {
    inner: Arc<GoTrueClientInner>,
}

struct GoTrueClientInner {
    client: reqwest::Client,
    config: SupabaseConfig,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Session returned by the token and sign-up endpoints.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

#[derive(Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TryFrom<GoTrueUser> for AuthUser {
    type Error = AuthError;

    fn try_from(user: GoTrueUser) -> Result<Self, Self::Error> {
        let email = user
            .email
            .ok_or_else(|| AuthError::Decode(format!("user {} has no email", user.id)))?;
        Ok(Self {
            id: user.id,
            email: Email::parse(&email)?,
        })
    }
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            access_token: AccessToken::new(self.access_token),
            refresh_token: RefreshToken::new(self.refresh_token),
            expires_at: self.expires_at.unwrap_or(now + self.expires_in),
            user: self.user.try_into()?,
        })
    }
}

impl GoTrueClient {
    /// Create a client for the project in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> Result<Self, AuthError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(GoTrueClientInner {
                client: http_client()?,
                config,
                events,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.inner.config.endpoint(&format!("auth/v1/{path}"))?)
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// POST to `/token` with the given grant.
    async fn grant<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<AuthSession, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let request = self
            .inner
            .client
            .post(self.endpoint("token")?)
            .query(&[("grant_type", grant_type)])
            .json(body);
        let response = authorize(request, &self.inner.config, None).send().await?;

        let status = response.status();
        if status.is_success() {
            let token: TokenResponse = response.json().await?;
            return token.into_session(now);
        }

        let raw = response.text().await.unwrap_or_default();
        Err(grant_error(status, &ErrorBody::parse(&raw)))
    }
}

/// Map a failed `/token` response.
fn grant_error(status: StatusCode, body: &ErrorBody) -> AuthError {
    let code = body.code();
    match (status, code.as_deref()) {
        (_, Some("email_not_confirmed")) => AuthError::Rejected {
            status: status.as_u16(),
            message: body.message(),
        },
        (StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED, _) => AuthError::InvalidCredentials,
        _ => AuthError::Rejected {
            status: status.as_u16(),
            message: body.message(),
        },
    }
}

/// Map a failed `/signup` response.
fn sign_up_error(status: StatusCode, body: &ErrorBody) -> AuthError {
    let message = body.message();
    match body.code().as_deref() {
        Some("user_already_exists" | "email_exists") => AuthError::UserAlreadyExists,
        Some("weak_password") => AuthError::WeakPassword(message),
        _ if message.contains("already registered") => AuthError::UserAlreadyExists,
        _ => AuthError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

/// Interpret a successful `/signup` body.
///
/// With auto-confirm on, GoTrue answers with a full session. Otherwise it
/// returns the pending user, either bare or under `user`.
fn sign_up_outcome(body: serde_json::Value, now: i64) -> Result<SignUpOutcome, AuthError> {
    if body.get("access_token").is_some() {
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| AuthError::Decode(e.to_string()))?;
        return Ok(SignUpOutcome::SignedIn(token.into_session(now)?));
    }

    let user = body.get("user").cloned().unwrap_or(body);
    let user: GoTrueUser =
        serde_json::from_value(user).map_err(|e| AuthError::Decode(e.to_string()))?;
    Ok(SignUpOutcome::ConfirmationSent(user.try_into()?))
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    #[instrument(skip_all)]
    async fn get_session(&self, token: &AccessToken) -> Result<Option<AuthUser>, AuthError> {
        let request = self.inner.client.get(self.endpoint("user")?);
        let response = authorize(request, &self.inner.config, Some(token.expose()))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: ErrorBody::parse(&raw).message(),
            });
        }

        let user: GoTrueUser = response.json().await?;
        Ok(Some(user.try_into()?))
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        let session = self
            .grant(
                "password",
                &PasswordGrant {
                    email: email.as_str(),
                    password: password.expose_secret(),
                },
            )
            .await?;

        self.publish(SessionEvent::SignedIn {
            token: session.access_token.cache_key(),
            user: session.user.clone(),
        });
        Ok(session)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        options: SignUpOptions,
    ) -> Result<SignUpOutcome, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let mut request = self.inner.client.post(self.endpoint("signup")?);
        if let Some(redirect_to) = &options.email_redirect_to {
            request = request.query(&[("redirect_to", redirect_to.as_str())]);
        }
        let request = request.json(&PasswordGrant {
            email: email.as_str(),
            password: password.expose_secret(),
        });
        let response = authorize(request, &self.inner.config, None).send().await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(sign_up_error(status, &ErrorBody::parse(&raw)));
        }

        let outcome = sign_up_outcome(response.json().await?, now)?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.publish(SessionEvent::SignedIn {
                token: session.access_token.cache_key(),
                user: session.user.clone(),
            });
        }
        Ok(outcome)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, token: &RefreshToken) -> Result<AuthSession, AuthError> {
        let session = self
            .grant(
                "refresh_token",
                &RefreshGrant {
                    refresh_token: token.expose(),
                },
            )
            .await?;

        self.publish(SessionEvent::TokenRefreshed {
            token: session.access_token.cache_key(),
            user: session.user.clone(),
        });
        Ok(session)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthError> {
        // The local session is over either way.
        self.publish(SessionEvent::SignedOut {
            token: token.cache_key(),
        });

        let request = self.inner.client.post(self.endpoint("logout")?);
        let response = authorize(request, &self.inner.config, Some(token.expose()))
            .send()
            .await?;

        let status = response.status();
        // An already-invalid token has nothing left to revoke.
        if status.is_success()
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::NOT_FOUND
        {
            return Ok(());
        }

        let raw = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message: ErrorBody::parse(&raw).message(),
        })
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn session_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "jwt-access",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": {"id": "8d0f6d0e-1111-2222-3333-444455556666", "email": "Lager@Example.COM", "aud": "authenticated"}
        })
    }

    #[test]
    fn test_token_response_uses_expires_in_without_expires_at() {
        let token: TokenResponse = serde_json::from_value(session_body()).unwrap();
        let session = token.into_session(NOW).unwrap();

        assert_eq!(session.expires_at, NOW + 3600);
        assert_eq!(session.access_token.expose(), "jwt-access");
        assert_eq!(session.user.email.as_str(), "Lager@example.com");
    }

    #[test]
    fn test_sign_up_outcome_with_session() {
        let outcome = sign_up_outcome(session_body(), NOW).unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
    }

    #[test]
    fn test_sign_up_outcome_pending_confirmation() {
        let bare = serde_json::json!({
            "id": "u-2",
            "email": "neu@example.com",
            "confirmation_sent_at": "2024-01-01T00:00:00Z"
        });
        match sign_up_outcome(bare, NOW).unwrap() {
            SignUpOutcome::ConfirmationSent(user) => assert_eq!(user.id, "u-2"),
            SignUpOutcome::SignedIn(_) => panic!("expected pending confirmation"),
        }

        let nested = serde_json::json!({"user": {"id": "u-3", "email": "neu@example.com"}, "session": null});
        assert!(matches!(
            sign_up_outcome(nested, NOW).unwrap(),
            SignUpOutcome::ConfirmationSent(_)
        ));
    }

    #[test]
    fn test_user_without_email_is_decode_error() {
        let body = serde_json::json!({"id": "u-4", "phone": "+491234"});
        assert!(matches!(
            sign_up_outcome(body, NOW),
            Err(AuthError::Decode(_))
        ));
    }

    #[test]
    fn test_grant_error_mapping() {
        let bad = ErrorBody::parse(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(
            grant_error(StatusCode::BAD_REQUEST, &bad),
            AuthError::InvalidCredentials
        ));

        let unconfirmed = ErrorBody::parse(
            r#"{"code":400,"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#,
        );
        assert!(matches!(
            grant_error(StatusCode::BAD_REQUEST, &unconfirmed),
            AuthError::Rejected { status: 400, .. }
        ));

        let down = ErrorBody::parse("upstream unavailable");
        assert!(matches!(
            grant_error(StatusCode::SERVICE_UNAVAILABLE, &down),
            AuthError::Rejected { status: 503, .. }
        ));
    }

    #[test]
    fn test_sign_up_error_mapping() {
        let exists = ErrorBody::parse(
            r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#,
        );
        assert!(matches!(
            sign_up_error(StatusCode::UNPROCESSABLE_ENTITY, &exists),
            AuthError::UserAlreadyExists
        ));

        let legacy = ErrorBody::parse(r#"{"msg":"User already registered"}"#);
        assert!(matches!(
            sign_up_error(StatusCode::BAD_REQUEST, &legacy),
            AuthError::UserAlreadyExists
        ));

        let weak = ErrorBody::parse(
            r#"{"error_code":"weak_password","msg":"Password should be at least 6 characters."}"#,
        );
        assert!(matches!(
            sign_up_error(StatusCode::UNPROCESSABLE_ENTITY, &weak),
            AuthError::WeakPassword(_)
        ));
    }
}
