//! Storefront HTTP API.
//!
//! [`StorefrontApi`] is the seam the controller talks through; [`HttpApi`]
//! implements it over `reqwest` with a bearer token obtained at signin.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use veblyss_core::{AddressBook, Cart, CartEntry, ProductId, UserProfile, Wishlist};

use crate::config::ClientConfig;

/// Errors from talking to the storefront.
///
/// Non-2xx responses are classified by status so callers can tell "sign in
/// again" apart from "try again later".
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not signed in")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// 2xx response whose body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    Url(String),
}

/// Error body emitted by the storefront: `{"error": ..., "message": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Classify a non-success response.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| body.trim().to_owned());

        match status {
            401 => Self::Unauthenticated,
            404 => Self::NotFound(message),
            400 | 422 => Self::Validation(message),
            409 => Self::Conflict(message),
            _ => Self::Server { status, message },
        }
    }

    /// Short text suitable for a transient notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Could not reach the store. Please try again.".to_owned(),
            Self::Unauthenticated => "Please sign in again.".to_owned(),
            Self::NotFound(_) => "That item is no longer available.".to_owned(),
            Self::Validation(message) | Self::Conflict(message) => message.clone(),
            Self::Server { .. } | Self::Decode(_) | Self::Url(_) => {
                "Something went wrong. Please try again.".to_owned()
            }
        }
    }
}

/// Operations the cart controller needs from the storefront.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// `POST /api/cart`: add or overwrite one entry.
    async fn add_to_cart(&self, entry: &CartEntry) -> Result<Cart, ApiError>;

    /// `PATCH /api/cart`: set a quantity; `<= 0` removes.
    async fn update_quantity(&self, product_id: &ProductId, quantity: i64)
    -> Result<Cart, ApiError>;

    /// `DELETE /api/cart/{productId}`.
    async fn remove_from_cart(&self, product_id: &ProductId) -> Result<Cart, ApiError>;

    /// `GET /api/user/current`.
    async fn current_user(&self) -> Result<UserProfile, ApiError>;

    /// `PATCH /api/user/update-wishlist`.
    async fn update_wishlist(&self, wishlist: &Wishlist) -> Result<UserProfile, ApiError>;

    /// `PATCH /api/user/update-address`.
    async fn update_addresses(&self, addresses: &AddressBook) -> Result<UserProfile, ApiError>;
}

#[derive(Debug, Deserialize)]
struct CartBody {
    cart: Cart,
}

#[derive(Debug, Deserialize)]
struct AuthBody {
    user: UserProfile,
    token: String,
}

/// `reqwest`-backed storefront client.
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base", &self.base.as_str())
            .field("signed_in", &self.has_token())
            .finish_non_exhaustive()
    }
}

impl HttpApi {
    /// Build a client for the configured storefront.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base: config.api_url.clone(),
            token: RwLock::new(None),
        })
    }

    /// Use an existing token (e.g. one restored from a previous session).
    pub fn set_token(&self, token: SecretString) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Whether a token is held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Create an account and keep its token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for missing fields or a weak password,
    /// `ApiError::Conflict` if the email is taken.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ApiError> {
        let body = json!({ "name": name, "email": email, "password": password });
        let auth: AuthBody = self
            .send_json(Method::POST, &["api", "auth", "signup"], &body)
            .await?;
        self.set_token(SecretString::from(auth.token));
        Ok(auth.user)
    }

    /// Sign in and keep the token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown email and
    /// `ApiError::Unauthenticated` for a wrong password.
    pub async fn signin(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let body = json!({ "email": email, "password": password });
        let auth: AuthBody = self
            .send_json(Method::POST, &["api", "auth", "signin"], &body)
            .await?;
        self.set_token(SecretString::from(auth.token));
        Ok(auth.user)
    }

    /// Sign out and forget the token.
    ///
    /// The token is dropped even if the request fails.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn signout(&self) -> Result<(), ApiError> {
        let result = self
            .send_json::<Value>(Method::POST, &["api", "auth", "signout"], &json!({}))
            .await;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        result.map(|_| ())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &Value,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let response = self.request(method, url).json(body).send().await?;
        read_body(response).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let response = self.request(method, url).send().await?;
        read_body(response).await
    }
}

async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "storefront request failed");
        return Err(ApiError::from_response(status.as_u16(), &body));
    }

    response
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Accept both a bare profile and one wrapped as `{"user": {...}}`.
fn unwrap_profile(value: Value) -> Result<UserProfile, ApiError> {
    let value = match value {
        Value::Object(mut object) if !object.contains_key("email") && object.contains_key("user") => {
            object.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl StorefrontApi for HttpApi {
    async fn add_to_cart(&self, entry: &CartEntry) -> Result<Cart, ApiError> {
        let body = serde_json::to_value(entry).map_err(|e| ApiError::Decode(e.to_string()))?;
        let response: CartBody = self.send_json(Method::POST, &["api", "cart"], &body).await?;
        Ok(response.cart)
    }

    async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Cart, ApiError> {
        let body = json!({ "productId": product_id, "quantity": quantity });
        let response: CartBody = self
            .send_json(Method::PATCH, &["api", "cart"], &body)
            .await?;
        Ok(response.cart)
    }

    async fn remove_from_cart(&self, product_id: &ProductId) -> Result<Cart, ApiError> {
        let response: CartBody = self
            .send(Method::DELETE, &["api", "cart", product_id.as_str()])
            .await?;
        Ok(response.cart)
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let value: Value = self.send(Method::GET, &["api", "user", "current"]).await?;
        unwrap_profile(value)
    }

    async fn update_wishlist(&self, wishlist: &Wishlist) -> Result<UserProfile, ApiError> {
        let body = json!({ "wishlistdata": wishlist });
        let value: Value = self
            .send_json(Method::PATCH, &["api", "user", "update-wishlist"], &body)
            .await?;
        unwrap_profile(value)
    }

    async fn update_addresses(&self, addresses: &AddressBook) -> Result<UserProfile, ApiError> {
        let body = json!({ "addressdata": addresses });
        let value: Value = self
            .send_json(Method::PATCH, &["api", "user", "update-address"], &body)
            .await?;
        unwrap_profile(value)
    }
}
