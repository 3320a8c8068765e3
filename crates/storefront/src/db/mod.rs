//! User document persistence.
//!
//! # Database: `veblyss`
//!
//! ## Tables
//!
//! - `storefront.user` - One row per user; cart, wishlist, orders and
//!   addresses live in JSONB columns next to a `version` counter.
//!
//! Every write goes through [`UserStore::compare_and_swap`], so two requests
//! that loaded the same version cannot both commit.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p veblyss-cli -- migrate
//! ```

pub mod memory;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use veblyss_core::{Email, UserId};

use crate::models::user::{NewUser, UserDocument};

pub use memory::MemoryUserStore;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Entity not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port for user documents.
///
/// Implementations must make [`compare_and_swap`](UserStore::compare_and_swap)
/// atomic with respect to each other for the same user id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserDocument>, RepositoryError>;

    /// Load a user by (normalized) email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserDocument>, RepositoryError>;

    /// Insert a new user with empty collections at version 0.
    ///
    /// # Errors
    ///
    /// `RepositoryError::Conflict` if the email is already registered.
    async fn create(&self, user: NewUser) -> Result<UserDocument, RepositoryError>;

    /// Write `document` if the stored version still equals `document.version`.
    ///
    /// On success the stored document is returned with its version bumped.
    /// `Ok(None)` means another write got there first (or the user is gone)
    /// and the caller should reload.
    ///
    /// # Errors
    ///
    /// `RepositoryError::Conflict` if the new email belongs to another user.
    async fn compare_and_swap(
        &self,
        document: &UserDocument,
    ) -> Result<Option<UserDocument>, RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
