//! Staff invites.
//!
//! # Environment Variables
//!
//! - `PUBLIC_SUPABASE_URL` - Supabase project URL
//! - `PUBLIC_SUPABASE_ANON_KEY` - Supabase anon key

use rand::{Rng, distr::Alphanumeric};
use secrecy::{ExposeSecret, SecretString};
use stockroom_core::Email;
use stockroom_web::config::SupabaseConfig;
use stockroom_web::identity::{IdentityProvider, SignUpOptions, SignUpOutcome};
use stockroom_web::supabase::GoTrueClient;
use url::Url;

use super::CliError;

const TEMPORARY_PASSWORD_LEN: usize = 24;

/// Sign up `email` with a random temporary password.
///
/// The user confirms through the email Supabase sends, then signs in with
/// the temporary password logged here.
///
/// # Errors
///
/// Returns an error if the email or redirect URL is invalid, configuration
/// is missing, or Supabase rejects the sign-up.
pub async fn invite(email: &str, redirect_to: Option<&str>) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let email_redirect_to = redirect_to.map(Url::parse).transpose()?;

    let auth = GoTrueClient::new(SupabaseConfig::from_env()?)?;
    let password = temporary_password();

    tracing::info!("Inviting {}...", email);
    let outcome = auth
        .sign_up(&email, &password, SignUpOptions { email_redirect_to })
        .await?;

    match outcome {
        SignUpOutcome::ConfirmationSent(user) => {
            tracing::info!("Invite sent. User id: {}", user.id);
            tracing::info!("They must confirm their email before signing in.");
        }
        SignUpOutcome::SignedIn(session) => {
            tracing::info!("Account created. User id: {}", session.user.id);
        }
    }
    tracing::info!("Temporary password: {}", password.expose_secret());

    Ok(())
}

fn temporary_password() -> SecretString {
    let password: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LEN)
        .map(char::from)
        .collect();
    SecretString::from(password)
}
