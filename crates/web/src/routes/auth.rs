//! Sign-in, sign-up and sign-out.
//!
//! The only server-rendered HTML page; everything behind the session gate
//! is JSON page data.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use stockroom_core::Email;

use crate::error::clear_sentry_user;
use crate::identity::{AuthError, SignUpOptions, SignUpOutcome};
use crate::middleware::{LOGIN_PATH, clear_tokens, set_tokens, stored_tokens};
use crate::models::session_keys;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login and sign-up form data.
#[derive(Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub notice: Option<String>,
    pub email: String,
}

impl LoginTemplate {
    fn failed(email: String, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            notice: None,
            email,
        }
    }
}

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const PROVIDER_UNAVAILABLE: &str = "Sign-in is unavailable right now. Please try again.";

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
///
/// GET /login
pub async fn login_page(session: Session) -> impl IntoResponse {
    let notice = session
        .remove::<String>(session_keys::LOGIN_NOTICE)
        .await
        .ok()
        .flatten();

    LoginTemplate {
        error: None,
        notice,
        email: String::new(),
    }
}

/// Handle login form submission.
///
/// POST /login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return (
            StatusCode::UNAUTHORIZED,
            LoginTemplate::failed(form.email, INVALID_CREDENTIALS),
        )
            .into_response();
    };

    let password = SecretString::from(form.password);
    match state.identity().sign_in(&email, &password).await {
        Ok(auth) => {
            if let Err(e) = set_tokens(&session, &auth).await {
                tracing::error!(error = %e, "Failed to store session");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    LoginTemplate::failed(form.email, PROVIDER_UNAVAILABLE),
                )
                    .into_response();
            }
            tracing::info!(user = %auth.user.email, "Signed in");
            Redirect::to("/").into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!(email = %email, "Sign-in rejected");
            (
                StatusCode::UNAUTHORIZED,
                LoginTemplate::failed(form.email, INVALID_CREDENTIALS),
            )
                .into_response()
        }
        // 4xx rejections concern the account itself (e.g. unconfirmed email).
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            let (status, message) = match &e {
                AuthError::Rejected {
                    status: 400..=499,
                    message,
                } => (StatusCode::UNAUTHORIZED, message.as_str()),
                _ => (StatusCode::SERVICE_UNAVAILABLE, PROVIDER_UNAVAILABLE),
            };
            (status, LoginTemplate::failed(form.email, message)).into_response()
        }
    }
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Handle sign-up form submission.
///
/// POST /signup
///
/// The confirmation email links back to the login page.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                LoginTemplate::failed(form.email, &format!("Invalid email: {e}")),
            )
                .into_response();
        }
    };

    let options = SignUpOptions {
        email_redirect_to: login_url(&state.config().base_url),
    };

    let password = SecretString::from(form.password);
    match state.identity().sign_up(&email, &password, options).await {
        Ok(outcome) => {
            let notice = match outcome {
                SignUpOutcome::ConfirmationSent(_) => {
                    "Check your email to confirm your account, then sign in."
                }
                SignUpOutcome::SignedIn(_) => "Account created. You can sign in now.",
            };
            tracing::info!(email = %email, "Signed up");
            if let Err(e) = session.insert(session_keys::LOGIN_NOTICE, notice).await {
                tracing::warn!(error = %e, "Failed to store login notice");
            }
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e @ (AuthError::UserAlreadyExists | AuthError::WeakPassword(_))) => (
            StatusCode::BAD_REQUEST,
            LoginTemplate::failed(form.email, &e.to_string()),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                LoginTemplate::failed(form.email, PROVIDER_UNAVAILABLE),
            )
                .into_response()
        }
    }
}

fn login_url(base_url: &str) -> Option<url::Url> {
    url::Url::parse(base_url)
        .and_then(|base| base.join(LOGIN_PATH))
        .ok()
}

// =============================================================================
// Logout Routes
// =============================================================================

/// Sign out at the provider and clear the session.
///
/// POST /logout
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    if let Some(tokens) = stored_tokens(&session).await
        && let Err(e) = state.identity().sign_out(&tokens.access_token()).await
    {
        tracing::warn!(error = %e, "Provider sign-out failed");
    }

    let _ = clear_tokens(&session).await;
    clear_sentry_user();

    Redirect::to(LOGIN_PATH)
}
