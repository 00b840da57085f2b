//! Stock totals report.
//!
//! # Environment Variables
//!
//! - `PUBLIC_SUPABASE_URL` - Supabase project URL
//! - `PUBLIC_SUPABASE_ANON_KEY` - Supabase anon key
//! - `STOCKROOM_PASSWORD` - Password of the staff member signing in
//! - `STOCKROOM_TRACKED_SKUS` - Totals to print (default: `liköer=SSL-001,klopfer=SSK-001`)

use secrecy::SecretString;
use stockroom_core::{Email, TotalsSummary};
use stockroom_web::catalog::{self, LoadOutcome, LoadPlan};
use stockroom_web::config::{SupabaseConfig, tracked_skus_from_env};
use stockroom_web::identity::IdentityProvider;
use stockroom_web::store::Scope;
use stockroom_web::supabase::{GoTrueClient, PostgrestStore};

use super::CliError;

/// Sign in as `email`, run the dashboard load and log the totals.
///
/// # Errors
///
/// Returns an error if sign-in fails or any stage of the load fails.
pub async fn report(email: &str) -> Result<(), CliError> {
    let supabase = SupabaseConfig::from_env()?;
    let password = std::env::var("STOCKROOM_PASSWORD")
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("STOCKROOM_PASSWORD"))?;
    let tracked = tracked_skus_from_env()?;
    let email = Email::parse(email)?;

    let auth = GoTrueClient::new(supabase.clone())?;
    let store = PostgrestStore::new(supabase)?;

    tracing::info!("Signing in as {}...", email);
    let session = auth.sign_in(&email, &password).await?;

    let scope = Scope::user(session.access_token.clone());
    let outcome = catalog::load(&store, &scope, LoadPlan::FULL).await;

    if let Err(e) = auth.sign_out(&session.access_token).await {
        tracing::warn!(error = %e, "Sign-out failed");
    }

    match outcome {
        LoadOutcome::Complete(catalog) => {
            tracing::info!(
                "Loaded {} products, {} storages, {} inventory rows",
                catalog.products.len(),
                catalog.storages.len(),
                catalog.inventory.len()
            );
            log_totals(&tracked.summarize(&catalog.inventory));
            Ok(())
        }
        LoadOutcome::Partial { failure, .. } => Err(CliError::Load(failure.message())),
    }
}

fn log_totals(totals: &TotalsSummary) {
    tracing::info!("Stock totals:");
    for (label, quantity) in totals.per_sku() {
        tracing::info!("  {label}: {quantity}");
    }
    tracing::info!("  total: {}", totals.total());
}
