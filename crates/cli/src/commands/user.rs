//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! vb-cli user create -e asha@example.com -n "Asha" -p 'correct horse'
//! ```

use thiserror::Error;

use veblyss_core::UserId;
use veblyss_storefront::db::{self, PgUserStore};
use veblyss_storefront::services::{AuthError, AuthService};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a user the same way signup does.
///
/// # Errors
///
/// Returns `UserCommandError::Auth` for invalid input or a taken email.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, UserCommandError> {
    dotenvy::dotenv().ok();

    let database_url =
        super::database_url().ok_or(UserCommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let store = PgUserStore::new(db::create_pool(&database_url).await?);

    let user = AuthService::new(&store).signup(name, email, password).await?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id)
}
