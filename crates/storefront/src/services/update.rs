//! Read-modify-write of a user document under optimistic concurrency.
//!
//! Every field mutation in the gateway goes through [`update_user`]: load the
//! document, apply the change in memory, then `compare_and_swap` against the
//! version that was loaded. A version mismatch means another request wrote in
//! between, so the change is re-applied to a fresh copy. Mutations must
//! therefore be functions of the loaded document, never of a stale snapshot.

use thiserror::Error;

use veblyss_core::UserId;

use crate::db::{RepositoryError, UserStore};
use crate::models::user::UserDocument;

/// Errors from a document update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The user does not exist (or was removed mid-update).
    #[error("user not found")]
    UserNotFound,

    /// Every attempt lost the version race.
    #[error("document kept changing, gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    /// The requested email belongs to another user.
    #[error("email already in use")]
    EmailTaken,

    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for UpdateError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(_) => Self::EmailTaken,
            RepositoryError::NotFound => Self::UserNotFound,
            other => Self::Repository(other),
        }
    }
}

/// Apply `mutate` to the user's document and persist it.
///
/// Retries up to `attempts` times on version mismatch. When the mutation
/// leaves the document unchanged nothing is written and the loaded document
/// is returned as is.
///
/// # Errors
///
/// `UpdateError::UserNotFound` if the user is missing on any attempt,
/// `UpdateError::Contention` once all attempts are exhausted.
pub async fn update_user<F>(
    store: &dyn UserStore,
    user_id: UserId,
    attempts: u32,
    mut mutate: F,
) -> Result<UserDocument, UpdateError>
where
    F: FnMut(&mut UserDocument) + Send,
{
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let loaded = store
            .find_by_id(user_id)
            .await?
            .ok_or(UpdateError::UserNotFound)?;

        let mut updated = loaded.clone();
        mutate(&mut updated);
        if updated == loaded {
            return Ok(loaded);
        }

        if let Some(stored) = store.compare_and_swap(&updated).await? {
            return Ok(stored);
        }

        tracing::debug!(%user_id, attempt, "user document changed concurrently, retrying");
    }

    tracing::warn!(%user_id, attempts, "giving up on contended user document");
    Err(UpdateError::Contention { attempts })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::MemoryUserStore;
    use crate::models::user::NewUser;
    use veblyss_core::Email;

    async fn seeded() -> (MemoryUserStore, UserId) {
        let store = MemoryUserStore::new();
        let user = store
            .create(NewUser {
                name: "A".to_owned(),
                email: Email::parse("a@example.com").unwrap(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn test_applies_and_bumps_version() {
        let (store, id) = seeded().await;
        let doc = update_user(&store, id, 3, |doc| doc.name = "B".to_owned())
            .await
            .unwrap();
        assert_eq!(doc.name, "B");
        assert_eq!(doc.version, 1);
    }

    #[tokio::test]
    async fn test_noop_mutation_skips_write() {
        let (store, id) = seeded().await;
        let doc = update_user(&store, id, 3, |_| {}).await.unwrap();
        assert_eq!(doc.version, 0);
    }

    #[tokio::test]
    async fn test_missing_user() {
        let (store, _) = seeded().await;
        let err = update_user(&store, UserId::new(404), 3, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::UserNotFound));
    }

    /// Store whose writes always lose the race.
    struct AlwaysStale {
        inner: MemoryUserStore,
        writes: AtomicU32,
    }

    #[async_trait]
    impl UserStore for AlwaysStale {
        async fn find_by_id(&self, id: UserId) -> Result<Option<UserDocument>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_email(
            &self,
            email: &Email,
        ) -> Result<Option<UserDocument>, RepositoryError> {
            self.inner.find_by_email(email).await
        }

        async fn create(&self, user: NewUser) -> Result<UserDocument, RepositoryError> {
            self.inner.create(user).await
        }

        async fn compare_and_swap(
            &self,
            _document: &UserDocument,
        ) -> Result<Option<UserDocument>, RepositoryError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn ping(&self) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let (inner, id) = seeded().await;
        let store = AlwaysStale {
            inner,
            writes: AtomicU32::new(0),
        };

        let err = update_user(&store, id, 4, |doc| doc.name.push('!'))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Contention { attempts: 4 }));
        assert_eq!(store.writes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let (store, id) = seeded().await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    update_user(store.as_ref(), id, 64, |doc| doc.name.push('x')).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let doc = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(doc.name, format!("A{}", "x".repeat(16)));
        assert_eq!(doc.version, 16);
    }
}
