//! Request identity types.

use serde::{Deserialize, Serialize};

use veblyss_core::UserId;

/// Identity resolved from a verified auth token.
///
/// Carries only the user id; handlers load the document themselves so they
/// always see the current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
}

/// Names of auth-related cookies and headers.
pub mod keys {
    /// Cookie carrying the auth token.
    pub const TOKEN_COOKIE: &str = "token";

    /// Authorization scheme accepted in the `Authorization` header.
    pub const BEARER_PREFIX: &str = "Bearer ";
}
