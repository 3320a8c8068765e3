//! Authentication service.
//!
//! Email + password accounts. Passwords are stored as Argon2id PHC strings;
//! sessions are stateless tokens issued by [`TokenService`](super::token::TokenService).
//! Password changes are written through [`update_user`] like every other
//! document mutation.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use veblyss_core::{Email, UserId};

use super::update::{UpdateError, update_user};
use crate::db::{RepositoryError, UserStore};
use crate::models::user::{NewUser, UserDocument};

/// Minimum password length, in characters.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Write attempts for a password change unless configured otherwise.
const DEFAULT_WRITE_ATTEMPTS: u32 = 5;

/// Authentication service.
///
/// Handles user registration, login and password changes.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    attempts: u32,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self {
            users,
            attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }

    /// Set how many compare-and-swap attempts a password change may make.
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if any field is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserDocument, AuthError> {
        let name = name.trim();
        if name.is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user signed up");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if either field is blank.
    /// Returns `AuthError::UserNotFound` if no account uses the email.
    /// Returns `AuthError::InvalidCredentials` if the password is wrong.
    #[instrument(skip(self, password))]
    pub async fn signin(&self, email: &str, password: &str) -> Result<UserDocument, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        // A malformed address cannot belong to any account.
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(password, &user.password_hash)?;

        tracing::info!(user_id = %user.id, "user signed in");
        Ok(user)
    }

    /// Replace a signed-in user's password after checking the current one.
    ///
    /// Issued tokens stay valid; only future signins see the new password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordsRequired` if either password is empty.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    /// Returns `AuthError::CurrentPasswordIncorrect` if `current` does not match.
    #[instrument(skip(self, current, new))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        if current.is_empty() || new.is_empty() {
            return Err(AuthError::PasswordsRequired);
        }
        if new.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "New password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        verify_password(current, &user.password_hash)
            .map_err(|_| AuthError::CurrentPasswordIncorrect)?;

        let password_hash = hash_password(new)?;
        update_user(self.users, user_id, self.attempts, |doc| {
            doc.password_hash.clone_from(&password_hash);
        })
        .await
        .map_err(|e| match e {
            UpdateError::UserNotFound => AuthError::UserNotFound,
            UpdateError::Repository(e) => AuthError::Repository(e),
            UpdateError::EmailTaken | UpdateError::Contention { .. } => AuthError::Contention,
        })?;

        tracing::info!(user_id = %user_id, "password changed");
        Ok(())
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Weak password. It must be at least {MIN_PASSWORD_LENGTH} characters long."
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryUserStore;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(matches!(
            verify_password("hunter23", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    async fn test_signup_then_signin() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);

        let created = auth
            .signup("Asha", "Asha@Example.com", "s3cret-pw")
            .await
            .unwrap();
        assert_eq!(created.email.as_str(), "asha@example.com");
        assert!(created.cart.is_empty());

        let signed_in = auth.signin("asha@example.com", "s3cret-pw").await.unwrap();
        assert_eq!(signed_in.id, created.id);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);

        assert!(matches!(
            auth.signup("", "a@b.co", "123456").await,
            Err(AuthError::MissingFields)
        ));
        assert!(matches!(
            auth.signup("A", "a@b.co", "123").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.signup("A", "not-an-email", "123456").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.signup("A", "a@b.co", "123456").await.unwrap();
        assert!(matches!(
            auth.signup("B", "a@b.co", "654321").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_change_password_replaces_hash() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        let user = auth.signup("A", "a@b.co", "old-pw-1").await.unwrap();

        auth.change_password(user.id, "old-pw-1", "new-pw-2")
            .await
            .unwrap();

        assert!(matches!(
            auth.signin("a@b.co", "old-pw-1").await,
            Err(AuthError::InvalidCredentials)
        ));
        let signed_in = auth.signin("a@b.co", "new-pw-2").await.unwrap();
        assert_eq!(signed_in.id, user.id);
        assert!(signed_in.version > user.version);
    }

    #[tokio::test]
    async fn test_change_password_rejections_leave_hash_alone() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store).with_attempts(2);
        let user = auth.signup("A", "a@b.co", "old-pw-1").await.unwrap();

        assert!(matches!(
            auth.change_password(user.id, "", "new-pw-2").await,
            Err(AuthError::PasswordsRequired)
        ));
        assert!(matches!(
            auth.change_password(user.id, "old-pw-1", "").await,
            Err(AuthError::PasswordsRequired)
        ));
        assert!(matches!(
            auth.change_password(user.id, "old-pw-1", "short").await,
            Err(AuthError::WeakPassword(msg)) if msg.contains("at least 6")
        ));
        assert!(matches!(
            auth.change_password(user.id, "wrong-pw", "new-pw-2").await,
            Err(AuthError::CurrentPasswordIncorrect)
        ));
        assert!(matches!(
            auth.change_password(UserId::new(9999), "old-pw-1", "new-pw-2").await,
            Err(AuthError::UserNotFound)
        ));

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, user.password_hash);
        assert_eq!(stored.version, user.version);
    }

    #[tokio::test]
    async fn test_signin_failures() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.signup("A", "a@b.co", "123456").await.unwrap();

        assert!(matches!(
            auth.signin("nobody@b.co", "123456").await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            auth.signin("a@b.co", "wrong-pw").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
