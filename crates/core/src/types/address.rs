//! Saved addresses.
//!
//! Early documents stored a single address object (with every field empty as
//! the signup default); later ones store an array where each address has its
//! own id. [`AddressBook`] accepts both and always exposes a list.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::id::AddressId;

/// A postal address with a contact phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl Address {
    /// Build an address from a loosely-typed object.
    ///
    /// Unknown or non-string fields are ignored; a missing or unparseable id
    /// is replaced with a fresh one.
    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .map(|s| s.trim().to_owned())
                .unwrap_or_default()
        };

        let id = ["id", "_id"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .and_then(|s| Uuid::parse_str(s).ok())
            .map_or_else(AddressId::generate, AddressId::from_uuid);

        Self {
            id,
            street: text(&["street"]),
            city: text(&["city"]),
            state: text(&["state"]),
            postal_code: text(&["postalCode", "postal_code", "postal", "zip"]),
            country: text(&["country"]),
            phone: text(&["phone"]),
        }
    }

    /// Whether every postal field is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
            &self.phone,
        ]
        .iter()
        .all(|field| field.is_empty())
    }
}

/// All addresses saved by a user, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AddressBook(Vec<Address>);

impl AddressBook {
    /// Normalize a raw JSON value into an address list.
    #[must_use]
    pub fn from_value(value: Option<Value>) -> Self {
        let addresses = match value {
            Some(Value::Object(object)) => vec![Address::from_object(&object)],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(Address::from_object)
                .collect(),
            _ => Vec::new(),
        };

        Self(
            addresses
                .into_iter()
                .filter(|address| !address.is_blank())
                .collect(),
        )
    }

    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, id: AddressId) -> Option<&Address> {
        self.0.iter().find(|address| address.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for AddressBook {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Option::<Value>::deserialize(deserializer)?))
    }
}
