//! Cart types and the raw-shape normalizer.
//!
//! A stored cart has historically been written in two shapes:
//!
//! ```text
//! mapping:  { "p1": { "quantity": 2, "name": "Tote", "price": 1200, "image": "/t.png" } }
//! sequence: [ { "productId": "p1", "qty": 2, ... }, { "id": "p2" } ]
//! ```
//!
//! [`RawCart`] classifies whatever JSON arrives and [`Cart::normalize`] turns it
//! into the one canonical [`Cart`]: an insertion-ordered sequence of
//! [`CartEntry`] with a product-id index for constant-time lookup.
//! Normalization never fails. Missing or malformed fields fall back to
//! defaults (quantity 1, price 0, empty name/image) and entries without a
//! usable product id are skipped.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::{CurrencyCode, Price, parse_amount};

/// One product line in a cart.
///
/// `quantity` is at least 1 whenever the entry lives inside a [`Cart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
}

impl CartEntry {
    /// Entry with quantity 1 and an empty display snapshot.
    #[must_use]
    pub const fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity: 1,
            name: String::new(),
            price: Decimal::ZERO,
            image: String::new(),
        }
    }

    /// Builder-style quantity setter.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Result of a quantity patch against a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityPatch {
    /// The entry exists and now has the requested quantity.
    Updated,
    /// The requested quantity was zero or negative and the entry was removed
    /// (or was already absent).
    Removed,
    /// No entry exists for the product; nothing changed.
    Missing,
}

/// The canonical cart representation.
///
/// Serializes as a JSON array of entries in insertion order. Deserializes from
/// either stored shape through [`Cart::normalize`].
#[derive(Debug, Clone, Default)]
pub struct Cart {
    entries: Vec<CartEntry>,
    index: HashMap<ProductId, usize>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize any raw cart shape into a canonical cart.
    #[must_use]
    pub fn normalize(raw: RawCart) -> Self {
        let mut cart = Self::new();
        match raw {
            RawCart::Absent => {}
            RawCart::Mapping(map) => {
                for (key, value) in map {
                    let Ok(product_id) = ProductId::parse(&key) else {
                        continue;
                    };
                    if let Some(entry) = entry_from_mapping_value(product_id, &value) {
                        cart.set(entry);
                    }
                }
            }
            RawCart::Sequence(items) => {
                for item in items {
                    if let Some(entry) = entry_from_sequence_item(&item) {
                        cart.set(entry);
                    }
                }
            }
        }
        cart
    }

    /// Normalize a raw JSON value (absent, mapping, or sequence).
    #[must_use]
    pub fn from_value(value: Option<Value>) -> Self {
        Self::normalize(RawCart::classify(value))
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    /// Consume the cart, returning its entries in order.
    #[must_use]
    pub fn into_entries(self) -> Vec<CartEntry> {
        self.entries
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, CartEntry> {
        self.entries.iter()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry exists for the product.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.index.contains_key(product_id)
    }

    /// Look up an entry by product id.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartEntry> {
        self.index
            .get(product_id)
            .and_then(|&pos| self.entries.get(pos))
    }

    /// Quantity currently held for a product, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.get(product_id).map(|entry| entry.quantity)
    }

    /// Product id to quantity lookup for rendering controls.
    #[must_use]
    pub fn quantities(&self) -> HashMap<ProductId, u32> {
        self.entries
            .iter()
            .map(|entry| (entry.product_id.clone(), entry.quantity))
            .collect()
    }

    /// Insert or fully overwrite the entry for `entry.product_id`.
    ///
    /// An overwritten product keeps its position; a new product is appended.
    /// An entry with quantity 0 removes the product instead of being stored.
    /// Returns the previous entry, if any.
    pub fn set(&mut self, entry: CartEntry) -> Option<CartEntry> {
        if entry.quantity == 0 {
            return self.remove(&entry.product_id);
        }

        if let Some(slot) = self
            .index
            .get(&entry.product_id)
            .and_then(|&pos| self.entries.get_mut(pos))
        {
            return Some(std::mem::replace(slot, entry));
        }

        self.index
            .insert(entry.product_id.clone(), self.entries.len());
        self.entries.push(entry);
        None
    }

    /// Apply a quantity patch.
    ///
    /// `quantity <= 0` removes the entry. A positive quantity replaces the
    /// stored quantity and keeps the rest of the snapshot. Patching a product
    /// that is not in the cart changes nothing.
    pub fn patch_quantity(&mut self, product_id: &ProductId, quantity: i64) -> QuantityPatch {
        if quantity <= 0 {
            self.remove(product_id);
            return QuantityPatch::Removed;
        }

        let Some(entry) = self
            .index
            .get(product_id)
            .and_then(|&pos| self.entries.get_mut(pos))
        else {
            return QuantityPatch::Missing;
        };

        entry.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        QuantityPatch::Updated
    }

    /// Remove a product, preserving the order of the remaining entries.
    ///
    /// Removing an absent product is a no-op.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartEntry> {
        let pos = self.index.remove(product_id)?;
        if pos >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(pos);
        for entry in self.entries.iter().skip(pos) {
            if let Some(slot) = self.index.get_mut(&entry.product_id) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Total number of units across all entries.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.quantity))
            .sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self, currency_code: CurrencyCode) -> Price {
        let amount = self.entries.iter().map(CartEntry::line_total).sum();
        Price::new(amount, currency_code)
    }
}

impl PartialEq for Cart {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Cart {}

impl FromIterator<CartEntry> for Cart {
    fn from_iter<I: IntoIterator<Item = CartEntry>>(iter: I) -> Self {
        let mut cart = Self::new();
        for entry in iter {
            cart.set(entry);
        }
        cart
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartEntry;
    type IntoIter = std::slice::Iter<'a, CartEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

/// A cart as found in a stored document or request body, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCart {
    /// `{ productId: partial entry }`
    Mapping(Map<String, Value>),
    /// `[ partial entry carrying productId or id ]`
    Sequence(Vec<Value>),
    /// Missing, null, or a scalar.
    Absent,
}

impl RawCart {
    /// Classify a raw JSON value by shape.
    #[must_use]
    pub fn classify(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self::Mapping(map),
            Some(Value::Array(items)) => Self::Sequence(items),
            _ => Self::Absent,
        }
    }
}

/// Interpret a JSON quantity leniently.
///
/// Integers pass through, finite floats truncate toward zero and numeric
/// strings are parsed after trimming. Anything else yields `None`.
#[must_use]
pub fn parse_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(truncate)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Read a quantity from `quantity` or `qty`, defaulting to 1.
///
/// Returns `None` when an explicit quantity is zero or negative.
fn read_quantity(object: &Map<String, Value>) -> Option<u32> {
    let raw = object.get("quantity").or_else(|| object.get("qty"));

    match raw.and_then(parse_quantity) {
        None => Some(1),
        Some(q) if q <= 0 => None,
        Some(q) => Some(u32::try_from(q).unwrap_or(u32::MAX)),
    }
}

#[allow(clippy::cast_possible_truncation)] // saturating float-to-int cast is the intent
const fn truncate(f: f64) -> i64 {
    f as i64
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn entry_from_object(product_id: ProductId, object: &Map<String, Value>) -> Option<CartEntry> {
    let quantity = read_quantity(object)?;
    let price = object
        .get("price")
        .and_then(parse_amount)
        .filter(|p| !p.is_sign_negative())
        .unwrap_or_default();

    Some(CartEntry {
        product_id,
        quantity,
        name: string_field(object, "name"),
        price,
        image: string_field(object, "image"),
    })
}

fn entry_from_mapping_value(product_id: ProductId, value: &Value) -> Option<CartEntry> {
    match value {
        Value::Object(object) => entry_from_object(product_id, object),
        // Legacy `{ productId: quantity }` documents.
        Value::Number(_) => {
            let mut object = Map::new();
            object.insert("quantity".to_owned(), value.clone());
            entry_from_object(product_id, &object)
        }
        _ => None,
    }
}

fn entry_from_sequence_item(item: &Value) -> Option<CartEntry> {
    match item {
        Value::Object(object) => entry_from_object(ProductId::from_object(object)?, object),
        Value::String(s) => ProductId::parse(s).ok().map(CartEntry::new),
        _ => None,
    }
}
