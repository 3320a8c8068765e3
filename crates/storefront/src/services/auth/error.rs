//! Signup, signin and password change failures.

use thiserror::Error;

use crate::db::RepositoryError;

/// Why an account operation was refused or failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Name, email or password was blank.
    #[error("All fields are required")]
    MissingFields,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] veblyss_core::EmailError),

    /// The account exists but the password does not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No account uses the email (or the email could not be parsed).
    #[error("User not found")]
    UserNotFound,

    /// Signup raced with, or repeated, an existing account.
    #[error("User already exists")]
    UserAlreadyExists,

    /// Carries the message shown to the client.
    #[error("{0}")]
    WeakPassword(String),

    #[error("Current password and new password are required")]
    PasswordsRequired,

    /// The signed-in user supplied the wrong current password.
    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,

    /// The account kept changing under a password update.
    #[error("account was modified concurrently")]
    Contention,

    #[error("user store error: {0}")]
    Repository(#[from] RepositoryError),

    /// Argon2 failed to hash or parse a stored hash.
    #[error("password hashing failed")]
    PasswordHash,
}
