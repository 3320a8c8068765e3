//! In-process user store.
//!
//! Same contract as [`PgUserStore`](super::PgUserStore), held in a
//! `RwLock<HashMap>`. Used by tests and by `STOREFRONT_STORE=memory`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;

use veblyss_core::{AddressBook, Cart, Email, UserId, Wishlist};

use super::{RepositoryError, UserStore};
use crate::models::user::{NewUser, UserDocument};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: HashMap<UserId, UserDocument>,
}

/// User store held entirely in memory.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    ///
    /// # Errors
    ///
    /// `RepositoryError::Unavailable` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.inner.read().map_err(poisoned)?.users.len())
    }

    /// Whether the store holds no users.
    ///
    /// # Errors
    ///
    /// `RepositoryError::Unavailable` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("user store lock poisoned".to_owned())
}

fn email_taken(inner: &Inner, email: &Email, except: Option<UserId>) -> bool {
    inner
        .users
        .values()
        .any(|user| user.email == *email && Some(user.id) != except)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserDocument>, RepositoryError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserDocument>, RepositoryError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.users.values().find(|user| user.email == *email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserDocument, RepositoryError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if email_taken(&inner, &user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let document = UserDocument {
            id: UserId::new(inner.next_id),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            cart: Cart::new(),
            wishlist: Wishlist::default(),
            orders: Map::new(),
            addresses: AddressBook::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(document.id, document.clone());
        Ok(document)
    }

    async fn compare_and_swap(
        &self,
        document: &UserDocument,
    ) -> Result<Option<UserDocument>, RepositoryError> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        let Some(current_version) = inner.users.get(&document.id).map(|user| user.version) else {
            return Ok(None);
        };
        if current_version != document.version {
            return Ok(None);
        }
        if email_taken(&inner, &document.email, Some(document.id)) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let mut stored = document.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        inner.users.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.read().map_err(poisoned)?;
        Ok(())
    }
}
