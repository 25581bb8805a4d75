// storefront/src/model/product.rs

use serde::Serialize;
use serde_json::Value;

use crate::money::Money;
use crate::store::tree::{as_i64_lenient, first_str};

/// A product record as read from `TBL_PRODUCTS/<id>`. Records are loosely typed, so
/// construction goes through [`Product::from_record`] instead of a derive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: String,
  pub name: String,
  pub price: Money,
  pub stock: i64,
  pub image: Option<String>,
  pub description: String,
}

impl Product {
  pub fn from_record(id: &str, record: &Value) -> Self {
    Product {
      id: id.to_string(),
      name: first_str(record, &["productName", "name"]).unwrap_or("Unknown").to_string(),
      price: Money::from_value(record.get("price")),
      stock: as_i64_lenient(record.get("stock")).unwrap_or(0),
      image: first_str(record, &["image"]).map(str::to_string),
      description: first_str(record, &["description"]).unwrap_or_default().to_string(),
    }
  }

  pub fn in_stock(&self) -> bool {
    self.stock > 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn lenient_fields() {
    let p = Product::from_record("P1", &json!({"name": "Booster", "price": "120.50", "stock": "3"}));
    assert_eq!(p.name, "Booster");
    assert_eq!(p.price, Money::from_cents(12_050));
    assert_eq!(p.stock, 3);
    assert!(p.in_stock());

    let empty = Product::from_record("P2", &json!({}));
    assert_eq!(empty.name, "Unknown");
    assert_eq!(empty.stock, 0);
    assert!(!empty.in_stock());
  }
}
