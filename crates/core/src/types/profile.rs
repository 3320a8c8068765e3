//! The user document as exchanged with clients.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::address::AddressBook;
use super::cart::Cart;
use super::email::Email;
use super::id::UserId;
use super::wishlist::Wishlist;

/// Everything a client sees about the signed-in user.
///
/// Field names follow the stored document (`cartdata`, `wishlistdata`, ...).
/// Collections are normalized on the way in and always serialized in
/// canonical form; the password hash never appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: Email,
    #[serde(rename = "cartdata", default)]
    pub cart: Cart,
    #[serde(rename = "wishlistdata", default)]
    pub wishlist: Wishlist,
    /// Order history is opaque to this service.
    #[serde(rename = "orderdata", default, deserialize_with = "object_or_empty")]
    pub orders: Map<String, Value>,
    #[serde(rename = "addressdata", default)]
    pub addresses: AddressBook,
}

/// Accept any JSON value, keeping it only if it is an object.
fn object_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map<String, Value>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}
