// tests/order_lifecycle_tests.rs
mod common;
use common::*;
use serde_json::json;
use serial_test::serial;
use storefront::{
  paths, DocumentStore, OrderId, OrderManager, OrderQuery, OrderStatus, PaymentMethod, PaymentSubmission, ShopError,
  ViolationReason,
};

fn manager() -> (storefront::MemoryStore, OrderManager) {
  let store = memory_store();
  let manager = OrderManager::new(shared(&store));
  (store, manager)
}

fn gcash_proof() -> PaymentSubmission {
  PaymentSubmission {
    method: PaymentMethod::Gcash,
    reference_id: " 1234567890 ".to_string(),
    proof_base64: "iVBORw0KGgo=".to_string(),
  }
}

#[tokio::test]
#[serial]
async fn test_create_order_persists_full_document() {
  setup_tracing();
  let (store, manager) = manager();
  let order_id = manager
    .create_order(new_order(
      vec![line("P1", "Booster Box", 15_000, 2), line("P2", "Sleeves", 7_550, 1)],
      PaymentMethod::Cash,
    ))
    .await
    .unwrap();
  assert!(OrderId::is_well_formed(&order_id), "bad id {}", order_id);

  let order = manager.get_order("uid-ana-0001", &order_id).await.unwrap().unwrap();
  assert_eq!(order.status, OrderStatus::PendingPayment);
  assert_eq!(order.totals.subtotal.cents(), 37_550);
  assert_eq!(order.totals.grand_total, order.totals.subtotal);
  assert_eq!(order.user_name, "Ana Cruz");
  assert_eq!(order.timeline.len(), 1);
  let first = order.timeline.last().unwrap();
  assert_eq!(first.status, "order_created");
  assert_eq!(first.note, "Order created and awaiting payment");

  let raw = store.get(&paths::order("uid-ana-0001", &order_id)).await.unwrap().unwrap();
  assert_eq!(raw["totals"]["subtotal"], json!(375.5));
  assert_eq!(raw["shipping"]["type"], json!("pickup"));
}

#[tokio::test]
#[serial]
async fn test_create_order_rejects_every_short_line_and_writes_nothing() {
  setup_tracing();
  let (store, manager) = manager();
  let mut preorder = line("P3", "Playmat", 90_000, 4);
  preorder.is_pre_order = true;

  let err = manager
    .create_order(new_order(
      vec![line("P1", "Booster Box", 15_000, 3), line("P9", "Ghost", 100, 1), preorder],
      PaymentMethod::Cash,
    ))
    .await
    .unwrap_err();

  let violations = err.violations();
  assert_eq!(violations.len(), 2);
  assert_eq!(violations[0].product_id, "P1");
  assert_eq!(
    violations[0].reason,
    ViolationReason::Insufficient {
      current_stock: 2,
      requested: 3
    }
  );
  assert_eq!(violations[1].reason, ViolationReason::NotFound);
  assert!(store.get(&paths::orders("uid-ana-0001")).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_invalid_transition_leaves_order_untouched() {
  setup_tracing();
  let (_store, manager) = manager();
  let order_id = pending_order(&manager).await;
  let before = manager.get_order("uid-ana-0001", &order_id).await.unwrap().unwrap();

  let err = manager
    .update_order_status("uid-ana-0001", &order_id, OrderStatus::Shipped, "skip ahead")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    ShopError::InvalidTransition {
      from: OrderStatus::PendingPayment,
      to: OrderStatus::Shipped
    }
  ));

  let after = manager.get_order("uid-ana-0001", &order_id).await.unwrap().unwrap();
  assert_eq!(before, after);
}

#[tokio::test]
#[serial]
async fn test_status_and_timeline_change_together() {
  setup_tracing();
  let (_store, manager) = manager();
  let order_id = pending_order(&manager).await;

  let order = manager
    .update_payment_info("uid-ana-0001", &order_id, &gcash_proof())
    .await
    .unwrap();
  assert_eq!(order.status, OrderStatus::PaymentSubmitted);
  assert_eq!(order.payment.reference_id, "1234567890");
  assert_eq!(order.timeline.len(), 2);
  assert_eq!(order.timeline.last().unwrap().note, "Payment proof submitted via GCash");
  assert_eq!(order.timeline.last().unwrap().status, "payment_submitted");

  let order = manager
    .approve_payment("uid-ana-0001", &order_id, "admin-1")
    .await
    .unwrap();
  assert_eq!(order.status, OrderStatus::Processing);
  assert_eq!(order.payment.verified_by.as_deref(), Some("admin-1"));
  let notes: Vec<&str> = order.timeline.entries().map(|e| e.note.as_str()).collect();
  assert_eq!(
    notes,
    vec![
      "Order created and awaiting payment",
      "Payment proof submitted via GCash",
      "Payment verified by admin",
      "Payment verified, order being prepared"
    ]
  );
}

#[tokio::test]
#[serial]
async fn test_pickup_path_to_completion() {
  setup_tracing();
  let (_store, manager) = manager();
  let order_id = pending_order(&manager).await;
  let owner = "uid-ana-0001";

  manager
    .update_order_status(owner, &order_id, OrderStatus::Processing, "Cash on pickup")
    .await
    .unwrap();
  let ready = manager.mark_ready_for_pickup(owner, &order_id, "admin-7").await.unwrap();
  assert_eq!(ready.admin.assigned_to.as_deref(), Some("admin-7"));
  assert!(ready.admin.last_reviewed.is_some());

  let done = manager.mark_completed(owner, &order_id).await.unwrap();
  assert!(done.status.is_terminal());
  assert!(manager.cancel(owner, &order_id, Some("too late")).await.is_err());
}

#[tokio::test]
#[serial]
async fn test_rejected_payment_can_be_resubmitted() {
  setup_tracing();
  let (_store, manager) = manager();
  let order_id = pending_order(&manager).await;
  let owner = "uid-ana-0001";

  manager.update_payment_info(owner, &order_id, &gcash_proof()).await.unwrap();
  let rejected = manager.reject_payment(owner, &order_id, "admin-1").await.unwrap();
  assert_eq!(rejected.status, OrderStatus::PaymentRejected);
  assert_eq!(rejected.payment.verified_at, None);

  let again = manager.update_payment_info(owner, &order_id, &gcash_proof()).await.unwrap();
  assert_eq!(again.status, OrderStatus::PaymentSubmitted);
}

#[tokio::test]
#[serial]
async fn test_stock_never_goes_negative_and_restock_adds_back() {
  setup_tracing();
  let (store, manager) = manager();
  let change = manager.decrement_product_stock("P1", 5).await.unwrap();
  assert_eq!((change.previous, change.current), (2, 0));
  assert_eq!(change.removed(), 2);

  manager.restock_product("P1", change.removed()).await.unwrap();
  let product = store.get(&paths::product("P1")).await.unwrap().unwrap();
  assert_eq!(product["stock"], json!(2));

  assert!(matches!(
    manager.decrement_product_stock("missing", 1).await,
    Err(ShopError::NotFound(_))
  ));
}

#[tokio::test]
#[serial]
async fn test_multi_line_stock_update_stops_at_first_failure() {
  setup_tracing();
  let (store, manager) = manager();
  let changes = manager
    .update_multiple_product_stock(&[line("P1", "Booster Box", 15_000, 1), line("P2", "Sleeves", 7_550, 2)])
    .await
    .unwrap();
  let levels: Vec<(&str, i64, i64)> = changes
    .iter()
    .map(|c| (c.product_id.as_str(), c.previous, c.current))
    .collect();
  assert_eq!(levels, vec![("P1", 2, 1), ("P2", 5, 3)]);

  let result = manager
    .update_multiple_product_stock(&[
      line("P1", "Booster Box", 15_000, 1),
      line("missing", "Ghost", 100, 1),
      line("P2", "Sleeves", 7_550, 1),
    ])
    .await;
  assert!(matches!(result, Err(ShopError::NotFound(_))));
  assert_eq!(store.get(&paths::product("P1")).await.unwrap().unwrap()["stock"], json!(0));
  assert_eq!(store.get(&paths::product("P2")).await.unwrap().unwrap()["stock"], json!(3));
}

#[tokio::test]
#[serial]
async fn test_queries_and_statistics() {
  setup_tracing();
  let (store, manager) = manager();
  let first = pending_order(&manager).await;
  let mut bo_order = new_order(vec![line("P1", "Booster Box", 15_000, 1)], PaymentMethod::Cash);
  bo_order.user_id = "uid-bo-00002".to_string();
  let second = manager.create_order(bo_order).await.unwrap();
  manager.cancel("uid-bo-00002", &second, None).await.unwrap();

  // An unmigrated top-level order must not be read as an owner bucket.
  store
    .set(
      &paths::all_orders().child("ORD-20240101-0001"),
      json!({ "orderId": "ORD-20240101-0001", "uid": "uid-ana-0001", "status": "PENDING_PAYMENT" }),
    )
    .await
    .unwrap();

  let stats = manager.statistics().await.unwrap();
  assert_eq!(stats.total, 2);
  assert_eq!(stats.count(OrderStatus::PendingPayment), 1);
  assert_eq!(stats.count(OrderStatus::Cancelled), 1);
  assert_eq!(stats.count(OrderStatus::Shipped), 0);

  let booster = manager
    .search(
      None,
      &OrderQuery {
        status: None,
        text: Some("booster".to_string()),
      },
    )
    .await
    .unwrap();
  assert_eq!(booster.len(), 1);
  assert_eq!(booster[0].owner, "uid-bo-00002");

  let mine = manager.user_orders("uid-ana-0001").await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].order_id, first);
  assert_eq!(
    manager.orders_by_status(OrderStatus::Cancelled).await.unwrap()[0].order.order_id,
    second
  );
}

#[tokio::test]
#[serial]
async fn test_admin_note_keeps_status() {
  setup_tracing();
  let (_store, manager) = manager();
  let order_id = pending_order(&manager).await;
  let order = manager
    .add_admin_note("uid-ana-0001", &order_id, "  Called the customer ")
    .await
    .unwrap();
  assert_eq!(order.admin.notes, "Called the customer");
  assert_eq!(order.status, OrderStatus::PendingPayment);
  assert!(manager.add_admin_note("uid-ana-0001", &order_id, " ").await.is_err());
}
