// tests/checkout_saga_tests.rs
mod common;
use common::*;
use serde_json::json;
use serial_test::serial;
use storefront::checkout::NextStep;
use storefront::{
  paths, CartReconciler, CatalogReader, DocPath, DocumentStore, LocalCart, OrderManager, OrderPlacement, OrderStatus,
  PaymentMethod, PaymentSubmission, ShopError, ViolationReason,
};

fn placement(store: &storefront::MemoryStore) -> OrderPlacement {
  OrderPlacement::new(OrderManager::new(shared(store)))
}

async fn stock_of(store: &storefront::MemoryStore, product_id: &str) -> serde_json::Value {
  store.get(&paths::product(product_id)).await.unwrap().unwrap()["stock"].clone()
}

#[test]
fn test_placement_plan_lists_steps_in_order() {
  let store = memory_store();
  assert_eq!(
    placement(&store).plan(),
    vec![
      "validate_stock -> run / -",
      "create_order -> run / undo",
      "submit_payment (conditional) -> run / -",
      "decrement_stock -> run / undo",
      "clear_cart? -> run / -",
      "clear_session -> run / -",
    ]
  );
}

#[tokio::test]
#[serial]
async fn test_checkout_rejects_quantity_above_stock_without_writing() {
  setup_tracing();
  let store = memory_store();
  let session = reviewed_session(&[cart_line("P1", 15_000, 3)], PaymentMethod::Cash);

  let err = placement(&store).place(&ana(), &session, None, None).await.unwrap_err();
  let violations = err.violations();
  assert_eq!(violations.len(), 1);
  assert_eq!(violations[0].product_id, "P1");
  assert_eq!(
    violations[0].reason,
    ViolationReason::Insufficient {
      current_stock: 2,
      requested: 3
    }
  );
  assert!(store.get(&paths::orders("uid-ana-0001")).await.unwrap().is_none());
  assert_eq!(stock_of(&store, "P1").await, json!(2));
  assert!(session.review_draft().is_some());
}

#[tokio::test]
#[serial]
async fn test_failed_stock_write_restocks_and_cancels_the_order() {
  setup_tracing();
  let store = memory_store();
  store.deny_writes(DocPath::parse("TBL_PRODUCTS/P2"));
  let session = reviewed_session(
    &[cart_line("P1", 15_000, 1), cart_line("P2", 7_550, 1)],
    PaymentMethod::Cash,
  );

  let err = placement(&store).place(&ana(), &session, None, None).await.unwrap_err();
  assert!(matches!(err, ShopError::PermissionDenied { .. }), "got {:?}", err);

  assert_eq!(stock_of(&store, "P1").await, json!(2));
  assert_eq!(stock_of(&store, "P2").await, json!("5"));

  let orders = OrderManager::new(shared(&store)).user_orders("uid-ana-0001").await.unwrap();
  assert_eq!(orders.len(), 1);
  let order = &orders[0];
  assert_eq!(order.status, OrderStatus::Cancelled);
  let last = order.timeline.last().unwrap();
  assert_eq!(last.status, "cancelled");
  assert!(last.note.starts_with("Checkout failed: "), "note was {:?}", last.note);
  assert!(last.note.contains("TBL_PRODUCTS/P2"));

  // The session survives so the customer can retry.
  assert!(session.review_draft().is_some());
  assert_eq!(session.last_order_id(), None);
}

#[tokio::test]
#[serial]
async fn test_wallet_checkout_end_to_end() {
  setup_tracing();
  let store = memory_store();
  let binding = std::sync::Arc::new(
    CartReconciler::new(shared(&store))
      .bind(
        &ana(),
        LocalCart::from_map([("P1".to_string(), 1), ("P2".to_string(), 2), ("P3".to_string(), 1)].into()),
      )
      .await
      .unwrap(),
  );

  let catalog = CatalogReader::new(shared(&store));
  let lines = binding.lines(&catalog).await.unwrap();
  let session = storefront::CheckoutSession::default();
  session
    .stage_selection(&lines, &["P1".to_string(), "P2".to_string()])
    .unwrap();
  session.review(pickup(), PaymentMethod::Gcash).unwrap();
  assert!(matches!(
    session.stage_payment_method().unwrap(),
    NextStep::SubmitPaymentProof { .. }
  ));

  let submission = PaymentSubmission {
    method: PaymentMethod::Gcash,
    reference_id: "REF-42".to_string(),
    proof_base64: "iVBORw0KGgo=".to_string(),
  };
  let placed = placement(&store)
    .place(&ana(), &session, Some(binding.clone()), Some(submission))
    .await
    .unwrap();

  assert_eq!(placed.status, OrderStatus::PaymentSubmitted);
  assert!(placed.cart_cleared);
  assert_eq!(placed.stock_changes.len(), 2);
  assert_eq!(stock_of(&store, "P1").await, json!(1));
  assert_eq!(stock_of(&store, "P2").await, json!(3));

  assert_eq!(binding.snapshot().keys().collect::<Vec<_>>(), vec!["P3"]);
  assert_eq!(binding.badge_count(), 1);
  assert_eq!(session.review_draft(), None);
  assert_eq!(session.last_order_id().as_deref(), Some(placed.order_id.as_str()));

  let order = OrderManager::new(shared(&store))
    .get_order("uid-ana-0001", &placed.order_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(order.payment.reference_id, "REF-42");
  assert_eq!(order.totals.subtotal.cents(), 15_000 + 2 * 7_550);
}

#[tokio::test]
#[serial]
async fn test_wallet_checkout_needs_proof_before_any_write() {
  setup_tracing();
  let store = memory_store();
  let session = reviewed_session(&[cart_line("P2", 7_550, 1)], PaymentMethod::Maya);

  let err = placement(&store).place(&ana(), &session, None, None).await.unwrap_err();
  assert_eq!(err.to_string(), "Validation error: Reference number is required");

  let blank_proof = PaymentSubmission {
    method: PaymentMethod::Maya,
    reference_id: "REF".to_string(),
    proof_base64: String::new(),
  };
  let err = placement(&store)
    .place(&ana(), &session, None, Some(blank_proof))
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), "Validation error: Payment screenshot is required");
  assert!(store.get(&paths::orders("uid-ana-0001")).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_pre_orders_skip_stock_and_unbound_cart_is_cleared_by_batch() {
  setup_tracing();
  let store = memory_store();
  store
    .set(&paths::cart("uid-ana-0001"), json!({ "P3": 2, "P2": 1 }))
    .await
    .unwrap();
  let mut preorder = cart_line("P3", 90_000, 2);
  preorder.is_pre_order = true;
  let session = reviewed_session(&[preorder], PaymentMethod::Credits);

  let placed = placement(&store).place(&ana(), &session, None, None).await.unwrap();
  assert_eq!(placed.status, OrderStatus::PendingPayment);
  assert!(placed.stock_changes.is_empty());
  assert_eq!(stock_of(&store, "P3").await, json!(0));
  assert_eq!(
    store.get(&paths::cart("uid-ana-0001")).await.unwrap(),
    Some(json!({ "P2": 1 }))
  );
}

#[tokio::test]
#[serial]
async fn test_cart_clear_failure_does_not_fail_checkout() {
  setup_tracing();
  let store = memory_store();
  store.set(&paths::cart("uid-ana-0001"), json!({ "P2": 1 })).await.unwrap();
  store.deny_writes(DocPath::parse("TBL_CART"));
  let session = reviewed_session(&[cart_line("P2", 7_550, 1)], PaymentMethod::Cash);

  let placed = placement(&store).place(&ana(), &session, None, None).await.unwrap();
  assert!(!placed.cart_cleared);
  assert_eq!(stock_of(&store, "P2").await, json!(4));
  assert_eq!(session.last_order_id().as_deref(), Some(placed.order_id.as_str()));
}
