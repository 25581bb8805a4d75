// tests/common/mod.rs
#![allow(dead_code)] // Not every suite uses every fixture

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;
use storefront::{
  CheckoutSession, Identity, LineItem, MemoryStore, Money, NewOrder, OrderManager, PaymentMethod, SharedStore,
  ShippingSelection,
};
use tracing::Level;

// --- Store fixtures ---

/// Products P1 (stock 2), P2 (stock 5) and P3 (out of stock, sold as pre-order).
pub fn catalog_document() -> Value {
  json!({
    "TBL_PRODUCTS": {
      "P1": { "productName": "Booster Box", "price": 150.0, "stock": 2 },
      "P2": { "productName": "Sleeves", "price": 75.5, "stock": "5" },
      "P3": { "name": "Playmat", "price": 900, "stock": 0 }
    },
    "users": {
      "uid-ana-0001": { "displayName": "Ana Cruz", "email": "ana@example.com" }
    }
  })
}

pub fn memory_store() -> MemoryStore {
  MemoryStore::with_document(catalog_document())
}

pub fn shared(store: &MemoryStore) -> SharedStore {
  Arc::new(store.clone())
}

pub fn ana() -> Identity {
  Identity::new("uid-ana-0001")
    .with_display_name("Ana Cruz")
    .with_email("ana@example.com")
}

pub fn line(product_id: &str, name: &str, price_cents: i64, quantity: u32) -> LineItem {
  LineItem {
    product_id: product_id.to_string(),
    name: name.to_string(),
    price: Money::from_cents(price_cents),
    quantity,
    is_pre_order: false,
    image: None,
  }
}

pub fn pickup() -> ShippingSelection {
  ShippingSelection::Pickup {
    name: "Ana Cruz".to_string(),
  }
}

pub fn new_order(items: Vec<LineItem>, method: PaymentMethod) -> NewOrder {
  let identity = ana();
  NewOrder {
    user_id: identity.uid.clone(),
    user_email: identity.email_or_empty().to_string(),
    user_name: identity.user_name(),
    items,
    shipping: pickup(),
    payment_method: method,
  }
}

/// Places a pending GCash order for Ana and returns its id.
pub async fn pending_order(manager: &OrderManager) -> String {
  manager
    .create_order(new_order(vec![line("P2", "Sleeves", 7_550, 1)], PaymentMethod::Gcash))
    .await
    .expect("fixture order should be created")
}

/// A checkout session staged with `lines` (all selected) and reviewed for pickup.
pub fn reviewed_session(lines: &[storefront::CartLine], method: PaymentMethod) -> CheckoutSession {
  let session = CheckoutSession::default();
  let ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();
  session.stage_selection(lines, &ids).expect("selection");
  session.review(pickup(), method).expect("review");
  session
}

pub fn cart_line(product_id: &str, price_cents: i64, quantity: u32) -> storefront::CartLine {
  storefront::CartLine {
    product_id: product_id.to_string(),
    name: format!("Product {}", product_id),
    price: Money::from_cents(price_cents),
    image: String::new(),
    quantity,
    is_pre_order: false,
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
