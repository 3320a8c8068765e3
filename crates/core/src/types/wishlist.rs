//! Wishlist type.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::id::ProductId;

/// Ordered, de-duplicated list of wished-for products.
///
/// Deserializes from a mapping keyed by product id, or from a sequence of
/// product ids or objects carrying `productId`, `id` or `_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Wishlist(Vec<ProductId>);

impl Wishlist {
    /// Normalize a raw JSON value.
    #[must_use]
    pub fn from_value(value: Option<Value>) -> Self {
        let mut wishlist = Self::default();
        match value {
            Some(Value::Object(map)) => {
                for key in map.keys() {
                    if let Ok(id) = ProductId::parse(key) {
                        wishlist.add(id);
                    }
                }
            }
            Some(Value::Array(items)) => {
                for item in &items {
                    let id = match item {
                        Value::String(s) => ProductId::parse(s).ok(),
                        Value::Object(object) => ProductId::from_object(object),
                        _ => None,
                    };
                    if let Some(id) = id {
                        wishlist.add(id);
                    }
                }
            }
            _ => {}
        }
        wishlist
    }

    /// Add a product; returns `false` if it was already present.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.contains(&product_id) {
            return false;
        }
        self.0.push(product_id);
        true
    }

    /// Remove a product; returns `false` if it was absent.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.0.len();
        self.0.retain(|id| id != product_id);
        self.0.len() != before
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.0.contains(product_id)
    }

    #[must_use]
    pub fn items(&self) -> &[ProductId] {
        &self.0
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

impl<'de> Deserialize<'de> for Wishlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Option::<Value>::deserialize(deserializer)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_strs(wishlist: &Wishlist) -> Vec<&str> {
        wishlist.items().iter().map(ProductId::as_str).collect()
    }

    #[test]
    fn test_normalizes_both_shapes() {
        let mapping = Wishlist::from_value(Some(json!({"p1": true, "p2": {}})));
        let sequence = Wishlist::from_value(Some(json!(["p1", {"productId": "p2"}])));
        assert_eq!(mapping, sequence);
    }

    #[test]
    fn test_deduplicates_preserving_first_position() {
        let wishlist = Wishlist::from_value(Some(json!(["b", "a", {"id": "b"}, 3])));
        assert_eq!(as_strs(&wishlist), vec!["b", "a"]);
    }

    #[test]
    fn test_object_items_accept_numeric_and_underscore_ids() {
        let wishlist = Wishlist::from_value(Some(json!([
            {"productId": 7},
            {"id": "a"},
            {"_id": "legacy"}
        ])));
        assert_eq!(as_strs(&wishlist), vec!["7", "a", "legacy"]);
    }

    #[test]
    fn test_add_and_remove() {
        let mut wishlist = Wishlist::default();
        let p1 = ProductId::parse("p1").unwrap();
        assert!(wishlist.add(p1.clone()));
        assert!(!wishlist.add(p1.clone()));
        assert!(wishlist.remove(&p1));
        assert!(!wishlist.remove(&p1));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_null_deserializes_empty() {
        let wishlist: Wishlist = serde_json::from_value(Value::Null).unwrap();
        assert!(wishlist.is_empty());
    }
}
