//! Session-scoped client state.
//!
//! [`ClientStore`] caches the signed-in user's profile, tracks optimistic cart
//! mutations that have not been confirmed yet, and holds transient notices.
//!
//! # Pending mutations
//!
//! Every optimistic change to a product's cart entry is recorded as a
//! [`PendingMutation`] in a per-product queue (oldest first). Each mutation
//! remembers the entry it replaced (`previous`) and the entry it wrote
//! (`applied`, `None` for a removal). Cart writes are absolute, so:
//!
//! - acknowledging a mutation drops it and every older mutation for the
//!   same product;
//! - failing the newest mutation restores its `previous`;
//! - failing an older one hands its `previous` to the next mutation, so a
//!   later failure of that one rolls back past both.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use veblyss_core::{AddressBook, Cart, CartEntry, ProductId, UserProfile, Wishlist};

/// How long a notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Identifies one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

/// One unconfirmed optimistic change to a cart entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub ticket: Ticket,
    pub previous: Option<CartEntry>,
    pub applied: Option<CartEntry>,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
}

impl Notice {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= NOTICE_TTL
    }
}

/// Client-side cache of the current session.
#[derive(Debug, Default)]
pub struct ClientStore {
    user: Option<UserProfile>,
    pending: HashMap<ProductId, VecDeque<PendingMutation>>,
    next_ticket: u64,
    notices: Vec<Notice>,
}

impl ClientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached profile wholesale.
    pub fn set_user(&mut self, profile: UserProfile) {
        self.user = Some(profile);
    }

    /// Forget everything: profile, pending mutations and notices.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Cart entries in display order; empty when nobody is signed in.
    #[must_use]
    pub fn cart_items(&self) -> &[CartEntry] {
        match &self.user {
            Some(profile) => profile.cart.entries(),
            None => &[],
        }
    }

    #[must_use]
    pub fn cart_entry(&self, product_id: &ProductId) -> Option<&CartEntry> {
        self.user.as_ref()?.cart.get(product_id)
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.user.as_ref()?.cart.quantity_of(product_id)
    }

    /// Product id to quantity for every cart entry.
    #[must_use]
    pub fn quantities(&self) -> HashMap<ProductId, u32> {
        self.user
            .as_ref()
            .map(|profile| profile.cart.quantities())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.user.as_ref().map_or(0, |profile| profile.cart.item_count())
    }

    /// Overwrite the cached wishlist.
    pub fn update_wishlist(&mut self, wishlist: Wishlist) {
        if let Some(profile) = self.user.as_mut() {
            profile.wishlist = wishlist;
        }
    }

    /// Overwrite the cached addresses.
    pub fn update_addresses(&mut self, addresses: AddressBook) {
        if let Some(profile) = self.user.as_mut() {
            profile.addresses = addresses;
        }
    }

    /// Apply an optimistic change and record it.
    ///
    /// `applied` is the entry to write, or `None` to remove the product.
    /// Returns `None` (and changes nothing) when nobody is signed in.
    pub fn begin(&mut self, product_id: &ProductId, applied: Option<CartEntry>) -> Option<Ticket> {
        let profile = self.user.as_mut()?;
        let previous = profile.cart.get(product_id).cloned();
        apply(&mut profile.cart, product_id, applied.clone());

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.pending
            .entry(product_id.clone())
            .or_default()
            .push_back(PendingMutation {
                ticket,
                previous,
                applied,
            });
        Some(ticket)
    }

    /// Confirm a mutation.
    ///
    /// The server's cart is adopted only when no mutation for any product is
    /// still pending, so out-of-order responses never overwrite newer intent.
    /// Returns `true` if the server cart was adopted.
    pub fn acknowledge(&mut self, product_id: &ProductId, ticket: Ticket, server_cart: Cart) -> bool {
        if let Some(queue) = self.pending.get_mut(product_id) {
            if let Some(pos) = queue.iter().position(|m| m.ticket == ticket) {
                queue.drain(..=pos);
            }
            if queue.is_empty() {
                self.pending.remove(product_id);
            }
        }

        if !self.pending.is_empty() {
            return false;
        }
        match self.user.as_mut() {
            Some(profile) => {
                profile.cart = server_cart;
                true
            }
            None => false,
        }
    }

    /// Roll back a failed mutation and raise a notice.
    ///
    /// A mutation already superseded by a confirmed newer one is ignored.
    pub fn fail(&mut self, product_id: &ProductId, ticket: Ticket, message: impl Into<String>) {
        self.raise_notice(message);

        let Some(queue) = self.pending.get_mut(product_id) else {
            return;
        };
        let Some(pos) = queue.iter().position(|m| m.ticket == ticket) else {
            return;
        };
        let Some(failed) = queue.remove(pos) else {
            return;
        };

        if let Some(next) = queue.get_mut(pos) {
            next.previous = failed.previous;
        } else if let Some(profile) = self.user.as_mut() {
            apply(&mut profile.cart, product_id, failed.previous);
        }

        if queue.is_empty() {
            self.pending.remove(product_id);
        }
    }

    /// Re-apply the newest optimistic value of every product that still has
    /// pending mutations, after the profile was replaced from the server.
    ///
    /// The oldest mutation's undo base becomes the freshly loaded entry.
    pub fn reapply_pending(&mut self) {
        let Some(profile) = self.user.as_mut() else {
            return;
        };

        for (product_id, queue) in &mut self.pending {
            if let Some(oldest) = queue.front_mut() {
                oldest.previous = profile.cart.get(product_id).cloned();
            }
            if let Some(newest) = queue.back() {
                apply(&mut profile.cart, product_id, newest.applied.clone());
            }
        }
    }

    #[must_use]
    pub fn pending_for(&self, product_id: &ProductId) -> Option<&VecDeque<PendingMutation>> {
        self.pending.get(product_id)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn raise_notice(&mut self, message: impl Into<String>) {
        self.raise_notice_at(message, Instant::now());
    }

    pub fn raise_notice_at(&mut self, message: impl Into<String>, now: Instant) {
        self.notices.push(Notice {
            message: message.into(),
            raised_at: now,
        });
    }

    /// Notices still visible at `now`; expired ones are dropped.
    pub fn active_notices(&mut self, now: Instant) -> &[Notice] {
        self.notices.retain(|notice| !notice.is_expired(now));
        &self.notices
    }
}

fn apply(cart: &mut Cart, product_id: &ProductId, entry: Option<CartEntry>) {
    match entry {
        Some(entry) => {
            cart.set(entry);
        }
        None => {
            cart.remove(product_id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn entry(id: &str, quantity: u32) -> CartEntry {
        CartEntry::new(pid(id)).with_quantity(quantity)
    }

    fn signed_in(cart: serde_json::Value) -> ClientStore {
        let mut store = ClientStore::new();
        store.set_user(
            serde_json::from_value(json!({
                "_id": "1",
                "name": "Asha",
                "email": "asha@example.com",
                "cartdata": cart,
            }))
            .unwrap(),
        );
        store
    }

    #[test]
    fn test_cart_items_empty_when_signed_out() {
        let mut store = signed_in(json!([{ "productId": "p1", "quantity": 2 }]));
        assert_eq!(store.cart_items().len(), 1);

        store.reset();
        assert!(store.cart_items().is_empty());
        assert_eq!(store.quantity_of(&pid("p1")), None);
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn test_begin_requires_user() {
        let mut store = ClientStore::new();
        assert!(store.begin(&pid("p1"), Some(entry("p1", 1))).is_none());
        assert!(!store.has_pending());
    }

    #[test]
    fn test_tickets_increase() {
        let mut store = signed_in(json!([]));
        let a = store.begin(&pid("p1"), Some(entry("p1", 1))).unwrap();
        let b = store.begin(&pid("p2"), Some(entry("p2", 1))).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_fail_newest_restores_previous() {
        let mut store = signed_in(json!([{ "productId": "p1", "quantity": 2 }]));
        let ticket = store.begin(&pid("p1"), Some(entry("p1", 3))).unwrap();
        assert_eq!(store.quantity_of(&pid("p1")), Some(3));

        store.fail(&pid("p1"), ticket, "nope");
        assert_eq!(store.quantity_of(&pid("p1")), Some(2));
        assert!(!store.has_pending());
    }

    #[test]
    fn test_fail_of_add_removes_entry() {
        let mut store = signed_in(json!([]));
        let ticket = store.begin(&pid("p1"), Some(entry("p1", 1))).unwrap();
        store.fail(&pid("p1"), ticket, "nope");
        assert!(store.cart_items().is_empty());
    }

    #[test]
    fn test_fail_older_rebases_next() {
        let mut store = signed_in(json!([{ "productId": "p1", "quantity": 1 }]));
        let first = store.begin(&pid("p1"), Some(entry("p1", 2))).unwrap();
        let second = store.begin(&pid("p1"), Some(entry("p1", 3))).unwrap();

        store.fail(&pid("p1"), first, "first failed");
        // The newer intent stays visible.
        assert_eq!(store.quantity_of(&pid("p1")), Some(3));

        store.fail(&pid("p1"), second, "second failed");
        assert_eq!(store.quantity_of(&pid("p1")), Some(1));
    }

    #[test]
    fn test_fail_only_touches_its_product() {
        let mut store = signed_in(json!([{ "productId": "p1", "quantity": 1 }]));
        let t1 = store.begin(&pid("p1"), Some(entry("p1", 5))).unwrap();
        store.begin(&pid("p2"), Some(entry("p2", 1))).unwrap();

        store.fail(&pid("p1"), t1, "nope");
        assert_eq!(store.quantity_of(&pid("p1")), Some(1));
        assert_eq!(store.quantity_of(&pid("p2")), Some(1));
    }

    #[test]
    fn test_ack_adopts_server_cart_when_idle() {
        let mut store = signed_in(json!([]));
        let ticket = store.begin(&pid("p1"), Some(entry("p1", 1))).unwrap();

        let server: Cart = [entry("p1", 1), entry("p9", 4)].into_iter().collect();
        assert!(store.acknowledge(&pid("p1"), ticket, server));
        assert_eq!(store.quantity_of(&pid("p9")), Some(4));
    }

    #[test]
    fn test_ack_ignores_server_cart_while_pending() {
        let mut store = signed_in(json!([]));
        let t1 = store.begin(&pid("p1"), Some(entry("p1", 1))).unwrap();
        store.begin(&pid("p2"), Some(entry("p2", 2))).unwrap();

        // Server has not seen p2 yet.
        let server: Cart = [entry("p1", 1)].into_iter().collect();
        assert!(!store.acknowledge(&pid("p1"), t1, server));
        assert_eq!(store.quantity_of(&pid("p2")), Some(2));
    }

    #[test]
    fn test_ack_supersedes_older_mutations() {
        let mut store = signed_in(json!([{ "productId": "p1", "quantity": 1 }]));
        let first = store.begin(&pid("p1"), Some(entry("p1", 2))).unwrap();
        let second = store.begin(&pid("p1"), Some(entry("p1", 3))).unwrap();

        let server: Cart = [entry("p1", 3)].into_iter().collect();
        store.acknowledge(&pid("p1"), second, server);
        assert!(!store.has_pending());

        // A late failure of the superseded mutation changes nothing.
        store.fail(&pid("p1"), first, "late");
        assert_eq!(store.quantity_of(&pid("p1")), Some(3));
    }

    #[test]
    fn test_reapply_after_refresh() {
        let mut store = signed_in(json!([{ "productId": "p1", "quantity": 1 }]));
        let ticket = store.begin(&pid("p1"), Some(entry("p1", 4))).unwrap();

        // Refresh returns the pre-mutation server state.
        store.set_user(
            serde_json::from_value(json!({
                "_id": "1",
                "email": "asha@example.com",
                "cartdata": { "p1": { "quantity": 2 } },
            }))
            .unwrap(),
        );
        store.reapply_pending();
        assert_eq!(store.quantity_of(&pid("p1")), Some(4));

        // Rolling back now lands on the refreshed value.
        store.fail(&pid("p1"), ticket, "nope");
        assert_eq!(store.quantity_of(&pid("p1")), Some(2));
    }

    #[test]
    fn test_removal_reapplied_after_refresh() {
        let mut store = signed_in(json!([{ "productId": "p1", "quantity": 1 }]));
        store.begin(&pid("p1"), None).unwrap();

        store.set_user(
            serde_json::from_value(json!({
                "_id": "1",
                "email": "asha@example.com",
                "cartdata": [{ "productId": "p1", "quantity": 1 }],
            }))
            .unwrap(),
        );
        store.reapply_pending();
        assert!(store.cart_items().is_empty());
    }

    #[test]
    fn test_notices_expire() {
        let mut store = ClientStore::new();
        let start = Instant::now();
        store.raise_notice_at("first", start);
        store.raise_notice_at("second", start + Duration::from_secs(2));

        assert_eq!(store.active_notices(start + Duration::from_secs(1)).len(), 2);
        let active = store.active_notices(start + Duration::from_secs(5));
        assert_eq!(active.len(), 1);
        assert_eq!(active.first().unwrap().message, "second");
        assert!(store.active_notices(start + Duration::from_secs(7)).is_empty());
    }

    #[test]
    fn test_fail_raises_notice() {
        let mut store = signed_in(json!([]));
        let ticket = store.begin(&pid("p1"), Some(entry("p1", 1))).unwrap();
        store.fail(&pid("p1"), ticket, "Could not update cart");
        assert_eq!(store.active_notices(Instant::now()).len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = signed_in(json!([]));
        store.begin(&pid("p1"), Some(entry("p1", 1))).unwrap();
        store.raise_notice("hello");

        store.reset();
        assert!(store.user().is_none());
        assert!(!store.has_pending());
        assert!(store.active_notices(Instant::now()).is_empty());
    }

    #[test]
    fn test_field_updates_ignored_when_signed_out() {
        let mut store = ClientStore::new();
        store.update_wishlist(Wishlist::from_value(Some(json!(["p1"]))));
        assert!(store.user().is_none());

        let mut store = signed_in(json!([]));
        store.update_wishlist(Wishlist::from_value(Some(json!(["p1"]))));
        assert_eq!(store.user().unwrap().wishlist.len(), 1);
    }
}
