//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::UserStore;
use crate::services::{AuthService, CartService, ProfileService, TokenService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the user store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - User document store (`PostgreSQL` or in-memory)
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn UserStore>) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_days);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the user store.
    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store()).with_attempts(self.inner.config.cas_retries)
    }

    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(self.store(), self.inner.config.cas_retries)
    }

    #[must_use]
    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(self.store(), self.inner.config.cas_retries)
    }
}
