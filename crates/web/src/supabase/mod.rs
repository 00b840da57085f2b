//! Supabase API clients.
//!
//! Stockroom talks to two Supabase services over HTTPS:
//!
//! - **GoTrue** (`/auth/v1`) - sign-in, sign-up, token refresh, sign-out
//! - **PostgREST** (`/rest/v1`) - catalog reads and transfer writes
//!
//! Every request carries the project's anon key in the `apikey` header.
//! Calls made on behalf of a signed-in user send that user's access token as
//! the bearer so row-level security applies; everything else sends the anon
//! key as the bearer.

pub mod auth;
pub mod rest;

pub use auth::GoTrueClient;
pub use rest::{PostgrestStore, Select};

use std::time::Duration;

use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::SupabaseConfig;

/// Request timeout for every Supabase call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared HTTP client.
///
/// # Errors
///
/// Returns `reqwest::Error` if the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("stockroom/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Attach `apikey` and `Authorization` headers.
///
/// `bearer` is the user's access token, or `None` to authorise as anon.
fn authorize(request: RequestBuilder, config: &SupabaseConfig, bearer: Option<&str>) -> RequestBuilder {
    let anon = config.anon_key.expose_secret();
    request
        .header("apikey", anon)
        .bearer_auth(bearer.unwrap_or(anon))
}

/// Error body shapes used by GoTrue and PostgREST.
///
/// GoTrue has used `error_description`, `msg` and `message` across versions;
/// PostgREST always uses `message` plus a Postgres or `PGRST` code.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Parse an error response body, falling back to the raw text.
    fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            message: Some(raw.trim().to_string()).filter(|m| !m.is_empty()),
            ..Self::default()
        })
    }

    fn message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    /// Machine-readable code (`error_code`, or `code` when it is a string).
    fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| match &self.code {
            Some(serde_json::Value::String(code)) => Some(code.clone()),
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_postgrest() {
        let body = ErrorBody::parse(
            r#"{"code":"42P01","details":null,"hint":null,"message":"relation \"public.storages\" does not exist"}"#,
        );
        assert_eq!(body.code().as_deref(), Some("42P01"));
        assert_eq!(body.message(), "relation \"public.storages\" does not exist");
    }

    #[test]
    fn test_error_body_gotrue_variants() {
        let old = ErrorBody::parse(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(old.message(), "Invalid login credentials");

        let new = ErrorBody::parse(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert_eq!(new.code().as_deref(), Some("invalid_credentials"));
        assert_eq!(new.message(), "Invalid login credentials");
    }

    #[test]
    fn test_error_body_plain_text() {
        assert_eq!(ErrorBody::parse("Bad Gateway").message(), "Bad Gateway");
        assert_eq!(ErrorBody::parse("").message(), "Unknown error");
    }
}
