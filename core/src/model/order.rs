// storefront/src/model/order.rs

//! The persisted order document and its parts.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::status::OrderStatus;
use crate::error::ShopError;
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
  pub product_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub price: Money,
  pub quantity: u32,
  #[serde(default)]
  pub is_pre_order: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
}

impl LineItem {
  pub fn line_total(&self) -> Money {
    self.price * self.quantity
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
  #[serde(default)]
  pub subtotal: Money,
  #[serde(default)]
  pub shipping: Money,
  #[serde(default)]
  pub grand_total: Money,
}

impl Totals {
  pub fn from_items(items: &[LineItem], shipping: Money) -> Self {
    let subtotal: Money = items.iter().map(LineItem::line_total).sum();
    Totals {
      subtotal,
      shipping,
      grand_total: subtotal + shipping,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingKind {
  Delivery,
  Pickup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShippingSelection {
  Delivery {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    zip: String,
  },
  Pickup {
    #[serde(default)]
    name: String,
  },
}

impl ShippingSelection {
  pub fn kind(&self) -> ShippingKind {
    match self {
      ShippingSelection::Delivery { .. } => ShippingKind::Delivery,
      ShippingSelection::Pickup { .. } => ShippingKind::Pickup,
    }
  }

  pub fn recipient(&self) -> &str {
    match self {
      ShippingSelection::Delivery { name, .. } | ShippingSelection::Pickup { name } => name,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Gcash,
  Maya,
  Cash,
  Credits,
}

impl PaymentMethod {
  /// Wallet payments that need a reference number and a proof screenshot.
  pub fn is_digital(self) -> bool {
    matches!(self, PaymentMethod::Gcash | PaymentMethod::Maya)
  }

  pub fn label(self) -> &'static str {
    match self {
      PaymentMethod::Gcash => "GCash",
      PaymentMethod::Maya => "Maya",
      PaymentMethod::Cash => "Cash",
      PaymentMethod::Credits => "Store Credits",
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for PaymentMethod {
  type Err = ShopError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "gcash" => Ok(PaymentMethod::Gcash),
      "maya" | "paymaya" => Ok(PaymentMethod::Maya),
      "cash" => Ok(PaymentMethod::Cash),
      "credits" | "credit" => Ok(PaymentMethod::Credits),
      _ => Err(ShopError::Validation(format!("Unsupported payment method '{}'", raw))),
    }
  }
}

impl<'de> Deserialize<'de> for PaymentMethod {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  #[default]
  Pending,
  Submitted,
  Verified,
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
  pub method: PaymentMethod,
  #[serde(default)]
  pub status: PaymentStatus,
  #[serde(default)]
  pub reference_id: String,
  #[serde(default)]
  pub proof_base64: String,
  #[serde(default)]
  pub verified_at: Option<i64>,
  #[serde(default)]
  pub verified_by: Option<String>,
}

impl Payment {
  pub fn pending(method: PaymentMethod) -> Self {
    Payment {
      method,
      status: PaymentStatus::Pending,
      reference_id: String::new(),
      proof_base64: String::new(),
      verified_at: None,
      verified_by: None,
    }
  }
}

/// One status-change record. `status` is free text: the first entry uses `order_created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
  pub status: String,
  #[serde(default)]
  pub timestamp: i64,
  #[serde(default)]
  pub note: String,
}

/// Append-only map of push keys to entries. Keys sort chronologically.
/// Array-shaped timelines from older documents are accepted and re-keyed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline(BTreeMap<String, TimelineEntry>);

impl Timeline {
  pub fn new() -> Self {
    Timeline(BTreeMap::new())
  }

  pub fn push(&mut self, key: String, entry: TimelineEntry) {
    self.0.insert(key, entry);
  }

  pub fn entries(&self) -> impl Iterator<Item = &TimelineEntry> {
    self.0.values()
  }

  pub fn last(&self) -> Option<&TimelineEntry> {
    self.0.values().next_back()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Serialize for Timeline {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.0.serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for Timeline {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct TimelineVisitor;

    impl<'de> Visitor<'de> for TimelineVisitor {
      type Value = Timeline;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of timeline entries or an array of them")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Timeline, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, entry)) = access.next_entry::<String, Option<TimelineEntry>>()? {
          if let Some(entry) = entry {
            entries.insert(key, entry);
          }
        }
        Ok(Timeline(entries))
      }

      fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Timeline, A::Error> {
        let mut entries = BTreeMap::new();
        let mut idx = 0usize;
        while let Some(entry) = access.next_element::<Option<TimelineEntry>>()? {
          if let Some(entry) = entry {
            entries.insert(format!("{:06}", idx), entry);
          }
          idx += 1;
        }
        Ok(Timeline(entries))
      }

      fn visit_unit<E: de::Error>(self) -> Result<Timeline, E> {
        Ok(Timeline::new())
      }
    }

    deserializer.deserialize_any(TimelineVisitor)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBlock {
  #[serde(default)]
  pub assigned_to: Option<String>,
  #[serde(default)]
  pub notes: String,
  #[serde(default)]
  pub last_reviewed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub order_id: String,
  pub user_id: String,
  #[serde(default)]
  pub user_email: String,
  #[serde(default)]
  pub user_name: String,
  pub status: OrderStatus,
  #[serde(default)]
  pub created_at: i64,
  #[serde(default)]
  pub updated_at: i64,
  #[serde(default)]
  pub items: Vec<LineItem>,
  #[serde(default)]
  pub totals: Totals,
  pub shipping: ShippingSelection,
  pub payment: Payment,
  #[serde(default)]
  pub timeline: Timeline,
  #[serde(default)]
  pub admin: AdminBlock,
}

/// What a caller supplies to create an order; everything else is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
  pub user_id: String,
  pub user_email: String,
  pub user_name: String,
  pub items: Vec<LineItem>,
  pub shipping: ShippingSelection,
  pub payment_method: PaymentMethod,
}
