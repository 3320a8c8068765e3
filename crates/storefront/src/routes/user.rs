//! User profile route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use veblyss_core::{AddressBook, Cart, Email, UserProfile, Wishlist};

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `PATCH /api/user/update-profile` body.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// The signed-in user's full profile.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn current(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles().current(user.id).await?))
}

/// Change name and/or email.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    let name = match body.name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::Validation("name must not be empty".to_owned()));
        }
        Some(name) => Some(name.trim().to_owned()),
        None => None,
    };
    let email = body
        .email
        .map(|raw| Email::parse(&raw))
        .transpose()
        .map_err(|e| AppError::Validation(format!("invalid email: {e}")))?;

    if name.is_none() && email.is_none() {
        return Err(AppError::Validation(
            "name or email is required".to_owned(),
        ));
    }

    let profile = state
        .profiles()
        .update_profile(user.id, name, email)
        .await?;
    Ok(Json(profile))
}

/// Replace the address list with `addressdata`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> Result<Json<UserProfile>> {
    let addresses = AddressBook::from_value(required_field(body, "addressdata")?);
    Ok(Json(
        state.profiles().replace_addresses(user.id, addresses).await?,
    ))
}

/// Replace the wishlist with `wishlistdata`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> Result<Json<UserProfile>> {
    let wishlist = Wishlist::from_value(required_field(body, "wishlistdata")?);
    Ok(Json(state.profiles().replace_wishlist(user.id, wishlist).await?))
}

/// Replace the cart with `cartdata`, in either stored shape.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> Result<Json<UserProfile>> {
    let cart = Cart::from_value(required_field(body, "cartdata")?);
    Ok(Json(state.profiles().replace_cart(user.id, cart).await?))
}

/// Take `key` out of the body. An explicit `null` is kept as "clear the field".
fn required_field(mut body: Map<String, Value>, key: &str) -> Result<Option<Value>> {
    match body.remove(key) {
        Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(value)),
        None => Err(AppError::Validation(format!("{key} is required"))),
    }
}
