//! Cart gateway.
//!
//! Per-product mutations of the signed-in user's cart. Each operation is a
//! pure function of the freshly loaded cart, applied through
//! [`update_user`](super::update::update_user) so concurrent requests for the
//! same user never overwrite each other's entries.
//!
//! ```text
//! ABSENT  --add-->          PRESENT(q)
//! PRESENT --patch(q'>0)-->  PRESENT(q')
//! PRESENT --patch(<=0)-->   ABSENT
//! PRESENT --remove-->       ABSENT
//! ABSENT  --remove-->       ABSENT
//! ```

use tracing::instrument;

use veblyss_core::{Cart, CartEntry, ProductId, QuantityPatch, UserId};

use super::update::{UpdateError, update_user};
use crate::db::UserStore;

/// Cart operations for one store.
pub struct CartService<'a> {
    store: &'a dyn UserStore,
    attempts: u32,
}

impl<'a> CartService<'a> {
    /// Create a cart service that retries contended writes up to `attempts` times.
    #[must_use]
    pub const fn new(store: &'a dyn UserStore, attempts: u32) -> Self {
        Self { store, attempts }
    }

    /// Insert or fully overwrite the entry for `entry.product_id`.
    ///
    /// # Errors
    ///
    /// See [`update_user`].
    #[instrument(skip(self, entry), fields(product_id = %entry.product_id))]
    pub async fn add_or_set(&self, user_id: UserId, entry: CartEntry) -> Result<Cart, UpdateError> {
        let doc = update_user(self.store, user_id, self.attempts, |doc| {
            doc.cart.set(entry.clone());
        })
        .await?;
        Ok(doc.cart)
    }

    /// Set the quantity of an existing entry, or remove it when `quantity <= 0`.
    ///
    /// Patching a product that is not in the cart leaves the cart unchanged.
    ///
    /// # Errors
    ///
    /// See [`update_user`].
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub async fn patch_quantity(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Cart, UpdateError> {
        let mut outcome = QuantityPatch::Missing;
        let doc = update_user(self.store, user_id, self.attempts, |doc| {
            outcome = doc.cart.patch_quantity(product_id, quantity);
        })
        .await?;

        if outcome == QuantityPatch::Missing {
            tracing::debug!("quantity patch for product not in cart ignored");
        }
        Ok(doc.cart)
    }

    /// Remove a product. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// See [`update_user`].
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub async fn remove(&self, user_id: UserId, product_id: &ProductId) -> Result<Cart, UpdateError> {
        let doc = update_user(self.store, user_id, self.attempts, |doc| {
            doc.cart.remove(product_id);
        })
        .await?;
        Ok(doc.cart)
    }
}
