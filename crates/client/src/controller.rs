//! Optimistic cart controller.
//!
//! Each operation updates the [`ClientStore`] first, then sends the request.
//! A success acknowledges the pending mutation; a failure rolls back only
//! the affected product and raises a notice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::instrument;

use veblyss_core::{AddressBook, CartEntry, ProductId, UserProfile, Wishlist};

use crate::api::{ApiError, StorefrontApi};
use crate::store::{ClientStore, Ticket};

/// Errors from controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("not signed in")]
    NotSignedIn,

    /// Relative changes need an existing entry; no request was sent.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// Drives cart mutations against the storefront while keeping the local
/// store optimistic.
pub struct CartController<A> {
    api: A,
    store: Arc<Mutex<ClientStore>>,
}

impl<A: StorefrontApi> CartController<A> {
    /// Controller with an empty, signed-out store.
    pub fn new(api: A) -> Self {
        Self::with_store(api, Arc::new(Mutex::new(ClientStore::new())))
    }

    /// Controller sharing an existing store.
    pub const fn with_store(api: A, store: Arc<Mutex<ClientStore>>) -> Self {
        Self { api, store }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Shared handle to the store, for rendering.
    #[must_use]
    pub fn store(&self) -> Arc<Mutex<ClientStore>> {
        Arc::clone(&self.store)
    }

    /// Snapshot of the cart entries; empty when signed out.
    #[must_use]
    pub fn cart_items(&self) -> Vec<CartEntry> {
        self.lock().cart_items().to_vec()
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.lock().quantity_of(product_id)
    }

    /// Session start: seed the store with a profile.
    pub fn start_session(&self, profile: UserProfile) {
        self.lock().set_user(profile);
    }

    /// Logout: clear profile, pending mutations and notices.
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Add a product or overwrite its entry.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a request, or the API error after the
    /// entry has been rolled back.
    #[instrument(skip(self, entry), fields(product_id = %entry.product_id))]
    pub async fn add(&self, entry: CartEntry) -> Result<()> {
        let product_id = entry.product_id.clone();
        let ticket = self.begin(&product_id, Some(entry.clone()))?;
        let result = self.api.add_to_cart(&entry).await;
        self.settle(&product_id, ticket, result)
    }

    /// Change a quantity by `delta`, never going below 1.
    ///
    /// # Errors
    ///
    /// Returns `NotInCart` without a request if the product has no entry.
    #[instrument(skip(self))]
    pub async fn increment(&self, product_id: &ProductId, delta: i64) -> Result<()> {
        let (ticket, quantity) = {
            let mut store = self.lock();
            if !store.is_authenticated() {
                return Err(ControllerError::NotSignedIn);
            }
            let current = store
                .cart_entry(product_id)
                .cloned()
                .ok_or_else(|| ControllerError::NotInCart(product_id.clone()))?;

            let quantity = (i64::from(current.quantity) + delta).max(1);
            let applied = current.with_quantity(u32::try_from(quantity).unwrap_or(u32::MAX));
            let ticket = store
                .begin(product_id, Some(applied))
                .ok_or(ControllerError::NotSignedIn)?;
            (ticket, quantity)
        };

        let result = self.api.update_quantity(product_id, quantity).await;
        self.settle(product_id, ticket, result)
    }

    /// Set an absolute quantity; `quantity <= 0` removes the entry.
    ///
    /// # Errors
    ///
    /// Returns `NotInCart` without a request when setting a positive
    /// quantity on a product that has no entry.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: i64) -> Result<()> {
        let ticket = {
            let mut store = self.lock();
            if !store.is_authenticated() {
                return Err(ControllerError::NotSignedIn);
            }
            let applied = if quantity <= 0 {
                None
            } else {
                let current = store
                    .cart_entry(product_id)
                    .cloned()
                    .ok_or_else(|| ControllerError::NotInCart(product_id.clone()))?;
                Some(current.with_quantity(u32::try_from(quantity).unwrap_or(u32::MAX)))
            };
            store
                .begin(product_id, applied)
                .ok_or(ControllerError::NotSignedIn)?
        };

        let result = self.api.update_quantity(product_id, quantity).await;
        self.settle(product_id, ticket, result)
    }

    /// Remove a product. Removing an absent product still asks the server.
    ///
    /// # Errors
    ///
    /// Returns the API error after the entry has been restored.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<()> {
        let ticket = self.begin(product_id, None)?;
        let result = self.api.remove_from_cart(product_id).await;
        self.settle(product_id, ticket, result)
    }

    /// Reload the profile, then re-apply still-pending optimistic changes.
    ///
    /// # Errors
    ///
    /// Returns the API error; the store is left untouched.
    #[instrument(skip(self))]
    pub async fn refresh_user(&self) -> Result<UserProfile> {
        let profile = self.api.current_user().await?;
        let mut store = self.lock();
        store.set_user(profile);
        store.reapply_pending();
        store.user().cloned().ok_or(ControllerError::NotSignedIn)
    }

    /// Save the wishlist and adopt the returned profile.
    ///
    /// # Errors
    ///
    /// Returns the API error and raises a notice.
    #[instrument(skip_all)]
    pub async fn save_wishlist(&self, wishlist: Wishlist) -> Result<()> {
        self.ensure_signed_in()?;
        match self.api.update_wishlist(&wishlist).await {
            Ok(profile) => {
                self.lock().update_wishlist(profile.wishlist);
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Save the address book and adopt the returned profile.
    ///
    /// # Errors
    ///
    /// Returns the API error and raises a notice.
    #[instrument(skip_all)]
    pub async fn save_addresses(&self, addresses: AddressBook) -> Result<()> {
        self.ensure_signed_in()?;
        match self.api.update_addresses(&addresses).await {
            Ok(profile) => {
                self.lock().update_addresses(profile.addresses);
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClientStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_signed_in(&self) -> Result<()> {
        if self.lock().is_authenticated() {
            Ok(())
        } else {
            Err(ControllerError::NotSignedIn)
        }
    }

    fn begin(&self, product_id: &ProductId, applied: Option<CartEntry>) -> Result<Ticket> {
        self.lock()
            .begin(product_id, applied)
            .ok_or(ControllerError::NotSignedIn)
    }

    fn settle(
        &self,
        product_id: &ProductId,
        ticket: Ticket,
        result: std::result::Result<veblyss_core::Cart, ApiError>,
    ) -> Result<()> {
        match result {
            Ok(cart) => {
                let adopted = self.lock().acknowledge(product_id, ticket, cart);
                tracing::debug!(adopted, "cart mutation confirmed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "cart mutation failed, rolling back");
                self.lock().fail(product_id, ticket, e.user_message());
                Err(e.into())
            }
        }
    }

    fn report(&self, error: ApiError) -> ControllerError {
        tracing::warn!(error = %error, "profile update failed");
        self.lock().raise_notice(error.user_message());
        error.into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    use async_trait::async_trait;
    use serde_json::json;
    use veblyss_core::Cart;

    use super::*;

    /// In-process storefront that mirrors the gateway's cart semantics.
    #[derive(Default)]
    struct MockApi {
        cart: Mutex<Cart>,
        fail: AtomicBool,
        requests: AtomicUsize,
    }

    impl MockApi {
        fn call(&self) -> std::result::Result<(), ApiError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Server {
                    status: 500,
                    message: "Server error".to_owned(),
                });
            }
            Ok(())
        }

        fn profile(&self) -> UserProfile {
            let cart = self.cart.lock().unwrap().clone();
            serde_json::from_value(json!({
                "_id": "1",
                "name": "Asha",
                "email": "asha@example.com",
                "cartdata": cart,
            }))
            .unwrap()
        }
    }

    #[async_trait]
    impl StorefrontApi for MockApi {
        async fn add_to_cart(&self, entry: &CartEntry) -> std::result::Result<Cart, ApiError> {
            self.call()?;
            let mut cart = self.cart.lock().unwrap();
            cart.set(entry.clone());
            Ok(cart.clone())
        }

        async fn update_quantity(
            &self,
            product_id: &ProductId,
            quantity: i64,
        ) -> std::result::Result<Cart, ApiError> {
            self.call()?;
            let mut cart = self.cart.lock().unwrap();
            cart.patch_quantity(product_id, quantity);
            Ok(cart.clone())
        }

        async fn remove_from_cart(
            &self,
            product_id: &ProductId,
        ) -> std::result::Result<Cart, ApiError> {
            self.call()?;
            let mut cart = self.cart.lock().unwrap();
            cart.remove(product_id);
            Ok(cart.clone())
        }

        async fn current_user(&self) -> std::result::Result<UserProfile, ApiError> {
            self.call()?;
            Ok(self.profile())
        }

        async fn update_wishlist(
            &self,
            wishlist: &Wishlist,
        ) -> std::result::Result<UserProfile, ApiError> {
            self.call()?;
            let mut profile = self.profile();
            profile.wishlist = wishlist.clone();
            Ok(profile)
        }

        async fn update_addresses(
            &self,
            addresses: &AddressBook,
        ) -> std::result::Result<UserProfile, ApiError> {
            self.call()?;
            let mut profile = self.profile();
            profile.addresses = addresses.clone();
            Ok(profile)
        }
    }

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn signed_in() -> CartController<MockApi> {
        let api = MockApi::default();
        let profile = api.profile();
        let controller = CartController::new(api);
        controller.start_session(profile);
        controller
    }

    #[tokio::test]
    async fn test_add_increment_decrement_remove() {
        let controller = signed_in();
        controller.add(CartEntry::new(pid("p1"))).await.unwrap();
        controller.increment(&pid("p1"), 1).await.unwrap();
        assert_eq!(controller.quantity_of(&pid("p1")), Some(2));

        controller.increment(&pid("p1"), -5).await.unwrap();
        assert_eq!(controller.quantity_of(&pid("p1")), Some(1));

        controller.set_quantity(&pid("p1"), 0).await.unwrap();
        assert!(controller.cart_items().is_empty());
        assert!(controller.api().cart.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_increment_absent_sends_nothing() {
        let controller = signed_in();
        let err = controller.increment(&pid("ghost"), 1).await.unwrap_err();
        assert!(matches!(err, ControllerError::NotInCart(_)));
        assert_eq!(controller.api().requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signed_out_sends_nothing() {
        let controller = CartController::new(MockApi::default());
        let err = controller.add(CartEntry::new(pid("p1"))).await.unwrap_err();
        assert!(matches!(err, ControllerError::NotSignedIn));
        assert_eq!(controller.api().requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_notifies() {
        let controller = signed_in();
        controller
            .add(CartEntry::new(pid("p1")).with_quantity(2))
            .await
            .unwrap();

        controller.api().fail.store(true, Ordering::SeqCst);
        assert!(controller.increment(&pid("p1"), 3).await.is_err());
        assert_eq!(controller.quantity_of(&pid("p1")), Some(2));

        assert!(controller.remove(&pid("p1")).await.is_err());
        assert_eq!(controller.quantity_of(&pid("p1")), Some(2));

        let store = controller.store();
        let mut store = store.lock().unwrap();
        assert_eq!(store.active_notices(Instant::now()).len(), 2);
        assert!(!store.has_pending());
    }

    #[tokio::test]
    async fn test_remove_preserves_order() {
        let controller = signed_in();
        for id in ["p1", "p2", "p3"] {
            controller.add(CartEntry::new(pid(id))).await.unwrap();
        }
        controller.remove(&pid("p2")).await.unwrap();
        controller.remove(&pid("p2")).await.unwrap();

        let ids: Vec<_> = controller
            .cart_items()
            .into_iter()
            .map(|e| e.product_id.to_string())
            .collect();
        assert_eq!(ids, ["p1", "p3"]);
    }

    #[tokio::test]
    async fn test_refresh_adopts_server_state() {
        let controller = signed_in();
        controller
            .api()
            .cart
            .lock()
            .unwrap()
            .set(CartEntry::new(pid("other-device")).with_quantity(3));

        let profile = controller.refresh_user().await.unwrap();
        assert_eq!(profile.cart.len(), 1);
        assert_eq!(controller.quantity_of(&pid("other-device")), Some(3));
    }

    #[tokio::test]
    async fn test_save_wishlist() {
        let controller = signed_in();
        let wishlist = Wishlist::from_value(Some(json!(["p1", "p2", "p1"])));
        controller.save_wishlist(wishlist).await.unwrap();

        let store = controller.store();
        let store = store.lock().unwrap();
        assert_eq!(store.user().unwrap().wishlist.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_signs_out() {
        let controller = signed_in();
        controller.add(CartEntry::new(pid("p1"))).await.unwrap();
        controller.reset();
        assert!(controller.cart_items().is_empty());
        assert!(matches!(
            controller.remove(&pid("p1")).await,
            Err(ControllerError::NotSignedIn)
        ));
    }
}
