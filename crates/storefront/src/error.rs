//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Every error response is a JSON object with an `error` key, plus a
//! `message` for validation and conflict errors.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::token::TokenError;
use crate::services::update::UpdateError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// No valid auth token on the request.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The token is valid but its user no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or invalid request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Token could not be issued.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UpdateError> for AppError {
    fn from(e: UpdateError) -> Self {
        match e {
            UpdateError::UserNotFound => Self::UserNotFound,
            UpdateError::EmailTaken => Self::Conflict("Email already in use".to_owned()),
            UpdateError::Contention { .. } => {
                Self::Conflict("The document was modified concurrently, please retry".to_owned())
            }
            UpdateError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::UserNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Auth(err) => match err {
                AuthError::MissingFields
                | AuthError::PasswordsRequired
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::InvalidCredentials | AuthError::CurrentPasswordIncorrect => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists | AuthError::Contention => StatusCode::CONFLICT,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Token(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body for this error. Internal details are never included.
    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::Unauthenticated => json!({ "error": "Unauthenticated" }),
            Self::UserNotFound => json!({ "error": "User not found" }),
            Self::NotFound(_) => json!({ "error": "Not found" }),
            Self::Validation(message) => json!({ "error": "ValidationError", "message": message }),
            Self::Conflict(message) => json!({ "error": "Conflict", "message": message }),
            Self::Auth(err) => match err {
                AuthError::MissingFields
                | AuthError::PasswordsRequired
                | AuthError::WeakPassword(_) => {
                    json!({ "error": "ValidationError", "message": auth_message(err) })
                }
                AuthError::InvalidEmail(_) => {
                    json!({ "error": "ValidationError", "message": "Invalid email address" })
                }
                AuthError::UserNotFound => json!({ "error": "User not found" }),
                AuthError::InvalidCredentials => json!({ "error": "Invalid credentials" }),
                AuthError::CurrentPasswordIncorrect => {
                    json!({ "error": "Current password is incorrect" })
                }
                AuthError::UserAlreadyExists => {
                    json!({ "error": "Conflict", "message": "User already exists" })
                }
                AuthError::Contention => json!({
                    "error": "Conflict",
                    "message": "The document was modified concurrently, please retry"
                }),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    json!({ "error": "Server error" })
                }
            },
            Self::Token(_) | Self::Database(_) | Self::Internal(_) => {
                json!({ "error": "Server error" })
            }
        }
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::WeakPassword(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on signout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
