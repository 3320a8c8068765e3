//! Profile gateway.
//!
//! Whole-field overwrites of the signed-in user's document. Unlike cart entry
//! mutations these are last-write-wins: the request body replaces the field.

use tracing::instrument;

use veblyss_core::{AddressBook, Cart, Email, UserId, UserProfile, Wishlist};

use super::update::{UpdateError, update_user};
use crate::db::UserStore;

/// Profile read and replace operations.
pub struct ProfileService<'a> {
    store: &'a dyn UserStore,
    attempts: u32,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn UserStore, attempts: u32) -> Self {
        Self { store, attempts }
    }

    /// The user's full profile.
    ///
    /// # Errors
    ///
    /// `UpdateError::UserNotFound` if the user does not exist.
    pub async fn current(&self, user_id: UserId) -> Result<UserProfile, UpdateError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(|doc| doc.profile())
            .ok_or(UpdateError::UserNotFound)
    }

    /// Change name and/or email. `None` leaves the field as is.
    ///
    /// # Errors
    ///
    /// `UpdateError::EmailTaken` if the email belongs to another user.
    #[instrument(skip(self, name, email))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        name: Option<String>,
        email: Option<Email>,
    ) -> Result<UserProfile, UpdateError> {
        let doc = update_user(self.store, user_id, self.attempts, |doc| {
            if let Some(name) = &name {
                doc.name.clone_from(name);
            }
            if let Some(email) = &email {
                doc.email = email.clone();
            }
        })
        .await?;
        Ok(doc.profile())
    }

    /// Replace the whole cart.
    ///
    /// # Errors
    ///
    /// See [`update_user`].
    #[instrument(skip(self, cart), fields(entries = cart.len()))]
    pub async fn replace_cart(&self, user_id: UserId, cart: Cart) -> Result<UserProfile, UpdateError> {
        let doc = update_user(self.store, user_id, self.attempts, |doc| {
            doc.cart = cart.clone();
        })
        .await?;
        Ok(doc.profile())
    }

    /// Replace the whole wishlist.
    ///
    /// # Errors
    ///
    /// See [`update_user`].
    #[instrument(skip(self, wishlist), fields(items = wishlist.len()))]
    pub async fn replace_wishlist(
        &self,
        user_id: UserId,
        wishlist: Wishlist,
    ) -> Result<UserProfile, UpdateError> {
        let doc = update_user(self.store, user_id, self.attempts, |doc| {
            doc.wishlist = wishlist.clone();
        })
        .await?;
        Ok(doc.profile())
    }

    /// Replace the whole address list.
    ///
    /// # Errors
    ///
    /// See [`update_user`].
    #[instrument(skip(self, addresses), fields(addresses = addresses.len()))]
    pub async fn replace_addresses(
        &self,
        user_id: UserId,
        addresses: AddressBook,
    ) -> Result<UserProfile, UpdateError> {
        let doc = update_user(self.store, user_id, self.attempts, |doc| {
            doc.addresses = addresses.clone();
        })
        .await?;
        Ok(doc.profile())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryUserStore;
    use crate::models::user::NewUser;

    async fn seeded(store: &MemoryUserStore, email: &str) -> UserId {
        store
            .create(NewUser {
                name: "A".to_owned(),
                email: Email::parse(email).unwrap(),
                password_hash: String::new(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_current_profile() {
        let store = MemoryUserStore::new();
        let id = seeded(&store, "a@example.com").await;
        let profile = ProfileService::new(&store, 5).current(id).await.unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.name, "A");
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let store = MemoryUserStore::new();
        let id = seeded(&store, "a@example.com").await;
        let profiles = ProfileService::new(&store, 5);

        let profile = profiles
            .update_profile(id, Some("Anaya".to_owned()), None)
            .await
            .unwrap();
        assert_eq!(profile.name, "Anaya");
        assert_eq!(profile.email.as_str(), "a@example.com");
    }

    #[tokio::test]
    async fn test_update_profile_email_taken() {
        let store = MemoryUserStore::new();
        seeded(&store, "a@example.com").await;
        let b = seeded(&store, "b@example.com").await;

        let err = ProfileService::new(&store, 5)
            .update_profile(b, None, Some(Email::parse("a@example.com").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::EmailTaken));
    }

    #[tokio::test]
    async fn test_replace_cart_from_mapping_shape() {
        let store = MemoryUserStore::new();
        let id = seeded(&store, "a@example.com").await;

        let cart = Cart::from_value(Some(json!({"p1": {"quantity": 2}, "p2": {}})));
        let profile = ProfileService::new(&store, 5)
            .replace_cart(id, cart)
            .await
            .unwrap();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["cartdata"][0]["productId"], "p1");
        assert_eq!(json["cartdata"][0]["quantity"], 2);
        assert_eq!(json["cartdata"][1]["quantity"], 1);
    }

    #[tokio::test]
    async fn test_replace_wishlist_and_addresses() {
        let store = MemoryUserStore::new();
        let id = seeded(&store, "a@example.com").await;
        let profiles = ProfileService::new(&store, 5);

        profiles
            .replace_wishlist(id, Wishlist::from_value(Some(json!(["p1", "p1", "p2"]))))
            .await
            .unwrap();
        let profile = profiles
            .replace_addresses(id, AddressBook::from_value(Some(json!([{"city": "Pune"}]))))
            .await
            .unwrap();

        assert_eq!(profile.wishlist.len(), 2);
        assert_eq!(profile.addresses.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_user() {
        let store = MemoryUserStore::new();
        let err = ProfileService::new(&store, 5)
            .current(UserId::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::UserNotFound));
    }
}
