// storefront/src/cart/mod.rs

//! Per-user carts: the merge policy, the realtime binding between a device cache and
//! `TBL_CART/<uid>`, and the identity-following sync.

pub mod local;
pub mod merge;
pub mod reconciler;

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::store::path::is_key;
use crate::store::tree::{as_i64_lenient, children};

pub use local::LocalCart;
pub use merge::merge_carts;
pub use reconciler::{CartBinding, CartReconciler, CartSync};

/// productId -> quantity.
pub type CartMap = BTreeMap<String, u32>;

/// Total units across the cart.
pub fn badge_count(cart: &CartMap) -> u32 {
  cart.values().fold(0u32, |total, qty| total.saturating_add(*qty))
}

/// Reads a stored cart leniently. Accepts the canonical map of quantities and the
/// legacy array of `{productId, quantity, ...}` records. Non-positive or unreadable
/// quantities are dropped.
pub fn cart_map_from_value(value: Option<&Value>) -> CartMap {
  let Some(value) = value else {
    return CartMap::new();
  };

  let mut cart = CartMap::new();
  match value {
    Value::Array(_) => {
      for (_, record) in children(value) {
        let Some(product_id) = record.get("productId").and_then(product_key) else {
          continue;
        };
        if let Some(qty) = positive_quantity(record.get("quantity")) {
          let entry = cart.entry(product_id).or_insert(0);
          *entry = entry.saturating_add(qty);
        }
      }
    }
    Value::Object(_) => {
      for (product_id, raw) in children(value) {
        if !is_key(&product_id) {
          continue;
        }
        // Legacy map-of-records shape: {pid: {productId, quantity}}.
        let qty = match raw {
          Value::Object(_) => positive_quantity(raw.get("quantity")),
          _ => positive_quantity(Some(raw)),
        };
        if let Some(qty) = qty {
          cart.insert(product_id, qty);
        }
      }
    }
    _ => {}
  }
  cart
}

pub fn cart_map_to_value(cart: &CartMap) -> Value {
  Value::Object(
    cart
      .iter()
      .filter(|(_, qty)| **qty > 0)
      .map(|(id, qty)| (id.clone(), Value::from(*qty)))
      .collect::<Map<String, Value>>(),
  )
}

fn product_key(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if is_key(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn positive_quantity(value: Option<&Value>) -> Option<u32> {
  as_i64_lenient(value).filter(|q| *q > 0).map(|q| q.min(i64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn reads_map_and_legacy_array_shapes() {
    let from_map = cart_map_from_value(Some(&json!({"P1": 2, "P2": "3", "P3": 0})));
    assert_eq!(from_map, CartMap::from([("P1".into(), 2), ("P2".into(), 3)]));

    let from_array = cart_map_from_value(Some(&json!([
      {"productId": "P1", "quantity": 1, "name": "Deck"},
      {"productId": "P1", "quantity": 2},
      {"productId": 7, "quantity": 1}
    ])));
    assert_eq!(from_array, CartMap::from([("P1".into(), 3), ("7".into(), 1)]));
    assert_eq!(badge_count(&from_array), 4);
  }
}
