//! Integration tests for Veblyss.
//!
//! Each test starts the real storefront router on an ephemeral port, backed
//! by the in-memory user store, and talks to it over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p veblyss-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_api` - Cart endpoints over raw HTTP
//! - `cart_controller` - Optimistic client controller against the server
//! - `auth_flow` - Signup, signin, cookie and signout

#![cfg_attr(not(test), forbid(unsafe_code))]
// Test harness: setup failures should abort the test.
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

use veblyss_client::{ClientConfig, HttpApi};
use veblyss_core::UserProfile;
use veblyss_storefront::config::StorefrontConfig;
use veblyss_storefront::db::MemoryUserStore;
use veblyss_storefront::{AppState, app};

/// Signing secret used by every test server.
pub const TEST_JWT_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// Password used by [`TestContext::signed_up`].
pub const TEST_PASSWORD: &str = "hunter22";

/// A running storefront plus clients pointed at it.
pub struct TestContext {
    pub base_url: Url,
    pub store: Arc<MemoryUserStore>,
    /// Cookie-aware HTTP client.
    pub http: reqwest::Client,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Start a storefront on `127.0.0.1:0`.
    pub async fn spawn() -> Self {
        let config = StorefrontConfig::from_lookup(|key| match key {
            "STOREFRONT_STORE" => Some("memory".to_owned()),
            "STOREFRONT_JWT_SECRET" => Some(TEST_JWT_SECRET.to_owned()),
            _ => None,
        })
        .expect("test config");

        let store = Arc::new(MemoryUserStore::new());
        let router = app(AppState::new(config, store.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("server");
        });

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("http client");

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("base url"),
            store,
            http,
            server,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        self.base_url.join(path).expect("join url").to_string()
    }

    /// A fresh, signed-out client API.
    #[must_use]
    pub fn api(&self) -> HttpApi {
        HttpApi::new(&ClientConfig::new(self.base_url.clone())).expect("client api")
    }

    /// Sign up `email` through the client API, returning the signed-in API.
    pub async fn signed_up(&self, email: &str) -> (HttpApi, UserProfile) {
        let api = self.api();
        let profile = api
            .signup("Test User", email, TEST_PASSWORD)
            .await
            .expect("signup");
        (api, profile)
    }

    /// Sign up `email` with the cookie-aware client; returns the response body.
    pub async fn signed_up_with_cookie(&self, email: &str) -> Value {
        let response = self
            .http
            .post(self.url("/api/auth/signup"))
            .json(&json!({ "name": "Cookie User", "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("signup request");
        assert_eq!(response.status(), 201);
        response.json().await.expect("signup body")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}
