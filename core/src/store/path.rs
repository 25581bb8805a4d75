// storefront/src/store/path.rs

//! Slash-separated, case-sensitive paths into the document tree.

use std::fmt;

use crate::error::{ShopError, ShopResult};

/// True when `key` names exactly one child: non-blank and free of `/`.
pub fn is_key(key: &str) -> bool {
  !key.trim().is_empty() && !key.contains('/')
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocPath(Vec<String>);

impl DocPath {
  /// The root of the tree.
  pub fn root() -> Self {
    DocPath(Vec::new())
  }

  /// Parses `"a/b/c"`. Empty segments (leading, trailing or doubled slashes) are ignored.
  pub fn parse(raw: &str) -> Self {
    DocPath(raw.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect())
  }

  pub fn child(&self, segment: impl AsRef<str>) -> Self {
    let mut segments = self.0.clone();
    segments.extend(segment.as_ref().split('/').filter(|s| !s.is_empty()).map(str::to_string));
    DocPath(segments)
  }

  /// Like [`DocPath::child`], but refuses keys that would address the parent itself or a
  /// nested path.
  pub fn key_child(&self, key: &str) -> ShopResult<Self> {
    if !is_key(key) {
      return Err(ShopError::Validation(format!("Invalid key {:?}", key)));
    }
    Ok(self.child(key))
  }

  pub fn segments(&self) -> &[String] {
    &self.0
  }

  pub fn last(&self) -> Option<&str> {
    self.0.last().map(String::as_str)
  }

  pub fn parent(&self) -> Option<DocPath> {
    if self.0.is_empty() {
      None
    } else {
      Some(DocPath(self.0[..self.0.len() - 1].to_vec()))
    }
  }

  /// True when `self` equals `other` or lies above it.
  pub fn is_ancestor_of(&self, other: &DocPath) -> bool {
    other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
  }

  /// True when a write at `self` can change the value observed at `other`.
  pub fn overlaps(&self, other: &DocPath) -> bool {
    self.is_ancestor_of(other) || other.is_ancestor_of(self)
  }
}

impl fmt::Display for DocPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "/{}", self.0.join("/"))
  }
}

impl From<&str> for DocPath {
  fn from(raw: &str) -> Self {
    DocPath::parse(raw)
  }
}

/// Canonical locations used across the crate.
pub mod paths {
  use super::DocPath;

  pub const USERS: &str = "users";
  pub const PRODUCTS: &str = "TBL_PRODUCTS";
  pub const CARTS: &str = "TBL_CART";
  pub const ORDERS: &str = "TBL_ORDERS";
  pub const EVENTS: &str = "TBL_EVENTS";
  pub const MATCHES: &str = "TBL_MATCHES";

  pub fn users() -> DocPath {
    DocPath::parse(USERS)
  }

  pub fn user(uid: &str) -> DocPath {
    users().child(uid)
  }

  pub fn products() -> DocPath {
    DocPath::parse(PRODUCTS)
  }

  pub fn product(product_id: &str) -> DocPath {
    products().child(product_id)
  }

  /// Canonical cart, keyed by uid.
  pub fn cart(uid: &str) -> DocPath {
    DocPath::parse(CARTS).child(uid)
  }

  /// Legacy cart keyed by the derived slug. Read by the migration only.
  pub fn legacy_slug_cart(slug: &str) -> DocPath {
    DocPath::parse(CARTS).child(slug)
  }

  /// Legacy per-profile cart array. Read by the migration only.
  pub fn legacy_profile_cart(uid: &str) -> DocPath {
    user(uid).child("cart")
  }

  pub fn all_orders() -> DocPath {
    DocPath::parse(ORDERS)
  }

  pub fn orders(owner: &str) -> DocPath {
    all_orders().child(owner)
  }

  pub fn order(owner: &str, order_id: &str) -> DocPath {
    orders(owner).child(order_id)
  }

  /// [`order`] for caller-supplied ids: both keys must name a single child.
  pub fn checked_order(owner: &str, order_id: &str) -> crate::error::ShopResult<DocPath> {
    all_orders().key_child(owner)?.key_child(order_id)
  }

  /// [`product`] for caller-supplied ids.
  pub fn checked_product(product_id: &str) -> crate::error::ShopResult<DocPath> {
    products().key_child(product_id)
  }

  pub fn events() -> DocPath {
    DocPath::parse(EVENTS)
  }

  pub fn event(event_id: &str) -> DocPath {
    events().child(event_id)
  }

  pub fn all_matches() -> DocPath {
    DocPath::parse(MATCHES)
  }

  pub fn matches(event_id: &str) -> DocPath {
    all_matches().child(event_id)
  }
}
