//! Development token issuance.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_JWT_SECRET` - Signing secret shared with the storefront

use secrecy::SecretString;
use thiserror::Error;

use veblyss_core::UserId;
use veblyss_storefront::services::{TokenError, TokenService};

#[derive(Debug, Error)]
pub enum TokenCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("TTL must be at least one day, got {0}")]
    InvalidTtl(i64),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Print a bearer token for `user_id`.
///
/// # Errors
///
/// Returns error if the secret is missing or signing fails.
pub fn issue(user_id: i64, ttl_days: i64) -> Result<(), TokenCommandError> {
    dotenvy::dotenv().ok();

    if ttl_days < 1 {
        return Err(TokenCommandError::InvalidTtl(ttl_days));
    }
    let secret = std::env::var("STOREFRONT_JWT_SECRET")
        .map(SecretString::from)
        .map_err(|_| TokenCommandError::MissingEnvVar("STOREFRONT_JWT_SECRET"))?;

    let token = TokenService::new(&secret, ttl_days).issue(UserId::new(user_id))?;
    tracing::info!(%user_id, ttl_days, "token issued");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}
