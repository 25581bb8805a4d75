// storefront/src/cart/local.rs

use parking_lot::RwLock;
use std::sync::Arc;

use super::{badge_count, CartMap};

#[derive(Debug, Default)]
struct LocalCartState {
  items: CartMap,
  badge: u32,
  revision: u64,
}

/// The device-side cart cache and badge count. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct LocalCart {
  state: Arc<RwLock<LocalCartState>>,
}

impl LocalCart {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_map(items: CartMap) -> Self {
    let local = Self::new();
    local.replace(items);
    local
  }

  pub fn snapshot(&self) -> CartMap {
    self.state.read().items.clone()
  }

  pub fn badge(&self) -> u32 {
    self.state.read().badge
  }

  /// Bumped on every replacement; lets observers tell whether an update landed.
  pub fn revision(&self) -> u64 {
    self.state.read().revision
  }

  pub fn replace(&self, items: CartMap) {
    let mut state = self.state.write();
    state.badge = badge_count(&items);
    state.items = items;
    state.revision += 1;
  }

  /// Guest-side add, before any identity is bound.
  pub fn add(&self, product_id: &str, quantity: u32) {
    let mut state = self.state.write();
    let entry = state.items.entry(product_id.to_string()).or_insert(0);
    *entry = entry.saturating_add(quantity);
    state.badge = badge_count(&state.items);
    state.revision += 1;
  }

  pub fn clear(&self) {
    self.replace(CartMap::new());
  }
}
