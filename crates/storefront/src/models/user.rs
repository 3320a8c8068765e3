//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use veblyss_core::{AddressBook, Cart, Email, UserId, UserProfile, Wishlist};

/// A stored user document.
///
/// Implements `Debug` manually to redact the password hash.
#[derive(Clone, PartialEq)]
pub struct UserDocument {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email, unique across users.
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub cart: Cart,
    pub wishlist: Wishlist,
    /// Opaque order history.
    pub orders: Map<String, Value>,
    pub addresses: AddressBook,
    /// Optimistic concurrency token, bumped on every write.
    pub version: i64,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserDocument {
    /// The client-facing view of this document.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            cart: self.cart.clone(),
            wishlist: self.wishlist.clone(),
            orders: self.orders.clone(),
            addresses: self.addresses.clone(),
        }
    }
}

impl std::fmt::Debug for UserDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDocument")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("cart", &self.cart)
            .field("wishlist", &self.wishlist)
            .field("orders", &self.orders)
            .field("addresses", &self.addresses)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Fields needed to create a user.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
}
