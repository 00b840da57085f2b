//! CLI command implementations.

pub mod invite;
pub mod report;

use stockroom_core::EmailError;
use stockroom_web::config::ConfigError;
use stockroom_web::identity::AuthError;
use stockroom_web::store::StoreError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid redirect URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The catalog only partially loaded.
    #[error("{0}")]
    Load(String),
}
