//! Cart route handlers.
//!
//! Every handler answers with the user's whole canonical cart so the client
//! can reconcile without a second request.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use veblyss_core::{Cart, CartEntry, ProductId, parse_quantity};

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Body of every cart response.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Cart,
}

/// `PATCH /api/cart` body.
///
/// Both fields stay raw JSON so that `"3"`, `2.0` and numeric product ids are
/// read the same way stored carts are.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    #[serde(rename = "productId", default)]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl UpdateQuantityRequest {
    fn product_id(&self) -> Result<ProductId> {
        match &self.product_id {
            Some(Value::String(s)) => required_product_id(Some(s.as_str())),
            Some(Value::Number(n)) => required_product_id(Some(n.to_string().as_str())),
            _ => required_product_id(None),
        }
    }

    fn quantity(&self) -> Result<i64> {
        let raw = self
            .quantity
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or_else(|| AppError::Validation("quantity is required".to_owned()))?;
        parse_quantity(raw)
            .ok_or_else(|| AppError::Validation("quantity must be a number".to_owned()))
    }
}

/// Add or overwrite a cart entry.
///
/// The body is a partial entry (`productId`, optional `quantity`, `name`,
/// `price`, `image`) and goes through the same normalizer as stored carts,
/// so missing display fields take their defaults.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<CartResponse>> {
    let entry = entry_from_body(body)?;
    let cart = state.carts().add_or_set(user.id, entry).await?;
    Ok(Json(CartResponse { cart }))
}

/// Set the quantity of an entry; zero or less removes it.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_quantity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>> {
    let product_id = body.product_id()?;
    let quantity = body.quantity()?;

    let cart = state
        .carts()
        .patch_quantity(user.id, &product_id, quantity)
        .await?;
    Ok(Json(CartResponse { cart }))
}

/// Remove an entry. Succeeds whether or not the product was in the cart.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>> {
    let product_id = required_product_id(Some(&product_id))?;
    let cart = state.carts().remove(user.id, &product_id).await?;
    Ok(Json(CartResponse { cart }))
}

fn required_product_id(raw: Option<&str>) -> Result<ProductId> {
    raw.and_then(|s| ProductId::parse(s).ok())
        .ok_or_else(|| AppError::Validation("productId is required".to_owned()))
}

/// Turn a partial-entry request body into a cart entry.
fn entry_from_body(body: Value) -> Result<CartEntry> {
    let Value::Object(object) = body else {
        return Err(AppError::Validation(
            "request body must be a JSON object".to_owned(),
        ));
    };

    let has_product_id = match object.get("productId") {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    };
    if !has_product_id {
        return Err(AppError::Validation("productId is required".to_owned()));
    }

    Cart::from_value(Some(json!([object])))
        .into_entries()
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("quantity must be a positive integer".to_owned()))
}
