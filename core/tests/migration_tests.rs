// tests/migration_tests.rs
mod common;
use common::*;
use serde_json::json;
use serial_test::serial;
use storefront::{paths, DocPath, DocumentStore, Migrator, OrderStatus};

const UID: &str = "uid-ana-0001";

/// Ana's data spread over every legacy location.
async fn legacy_store() -> storefront::MemoryStore {
  let store = memory_store();
  store.set(&paths::cart(UID), json!({ "P2": 5, "P3": 1 })).await.unwrap();
  store
    .set(&paths::legacy_slug_cart("Ana_Cruz"), json!({ "P1": 2, "P2": 1 }))
    .await
    .unwrap();
  store
    .set(
      &paths::legacy_profile_cart(UID),
      json!([{ "productId": "P3", "quantity": 4 }, { "productId": "P4", "quantity": 1 }]),
    )
    .await
    .unwrap();

  store
    .set(
      &paths::order(UID, "ORD-3"),
      json!({ "orderId": "ORD-3", "userId": UID, "status": "proof_declined", "items": [] }),
    )
    .await
    .unwrap();
  store
    .set(
      &paths::order("ana_cruz", "ORD-1"),
      json!({ "orderId": "ORD-1", "userId": UID, "status": "TO_SHIP", "items": [] }),
    )
    .await
    .unwrap();
  store
    .set(
      &paths::order("ana_cruz", "ORD-2"),
      json!({ "orderId": "ORD-2", "userId": "uid-someone-else", "status": "shipped", "items": [] }),
    )
    .await
    .unwrap();
  store
    .set(
      &paths::all_orders().child("ORD-20240101-0001"),
      json!({ "orderId": "ORD-20240101-0001", "uid": UID, "status": "PENDING_PAYMENT", "items": [] }),
    )
    .await
    .unwrap();
  store
}

#[tokio::test]
#[serial]
async fn test_migration_moves_carts_and_orders_to_uid_keys() {
  setup_tracing();
  let store = legacy_store().await;
  let migrator = Migrator::new(shared(&store));

  let report = migrator.migrate_user(&ana()).await.unwrap();
  assert_eq!(report.cart_lines_merged, 3);
  assert_eq!(report.legacy_carts_removed, 2);
  assert_eq!(report.orders_moved, 2);
  assert_eq!(report.statuses_normalized, 3);
  assert!(report.conflicts.is_empty());

  // Slug entries win over canonical ones; profile entries only fill gaps.
  assert_eq!(
    store.get(&paths::cart(UID)).await.unwrap(),
    Some(json!({ "P1": 2, "P2": 1, "P3": 1, "P4": 1 }))
  );
  assert!(store.get(&paths::legacy_slug_cart("Ana_Cruz")).await.unwrap().is_none());
  assert!(store.get(&paths::legacy_profile_cart(UID)).await.unwrap().is_none());
  assert!(store.get(&paths::user(UID)).await.unwrap().is_some());

  let moved = store.get(&paths::order(UID, "ORD-20240101-0001")).await.unwrap().unwrap();
  assert_eq!(moved["userId"], json!(UID));
  assert_eq!(moved["status"], json!("pending_payment"));
  assert!(moved.get("uid").is_none());
  assert!(store
    .get(&paths::all_orders().child("ORD-20240101-0001"))
    .await
    .unwrap()
    .is_none());

  let canonical = store.get(&paths::orders(UID)).await.unwrap().unwrap();
  let statuses: Vec<(&str, &str)> = ["ORD-1", "ORD-3", "ORD-20240101-0001"]
    .iter()
    .map(|id| (*id, canonical[*id]["status"].as_str().unwrap_or_default()))
    .collect();
  assert_eq!(
    statuses,
    vec![
      ("ORD-1", OrderStatus::Processing.as_str()),
      ("ORD-3", OrderStatus::PaymentRejected.as_str()),
      ("ORD-20240101-0001", OrderStatus::PendingPayment.as_str())
    ]
  );

  // Someone else's order in the slug container stays put.
  assert!(store.get(&paths::order("ana_cruz", "ORD-2")).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn test_second_run_is_a_noop() {
  setup_tracing();
  let store = legacy_store().await;
  let migrator = Migrator::new(shared(&store));
  migrator.migrate_user(&ana()).await.unwrap();
  let after_first = store.snapshot();

  let report = migrator.migrate_user(&ana()).await.unwrap();
  assert!(report.is_noop(), "{:?}", report);
  assert_eq!(store.snapshot(), after_first);
}

#[tokio::test]
#[serial]
async fn test_existing_uid_order_wins_over_legacy_copy() {
  setup_tracing();
  let store = memory_store();
  store
    .set(
      &paths::order(UID, "ORD-1"),
      json!({ "orderId": "ORD-1", "userId": UID, "status": "completed" }),
    )
    .await
    .unwrap();
  store
    .set(
      &paths::order("ana_cruz", "ORD-1"),
      json!({ "orderId": "ORD-1", "userId": UID, "status": "pending_payment" }),
    )
    .await
    .unwrap();

  let report = Migrator::new(shared(&store)).migrate_user(&ana()).await.unwrap();
  assert_eq!(report.conflicts, vec!["ORD-1".to_string()]);
  assert_eq!(report.orders_moved, 0);
  let kept = store.get(&paths::order(UID, "ORD-1")).await.unwrap().unwrap();
  assert_eq!(kept["status"], json!("completed"));
  assert!(store.get(&DocPath::parse("TBL_ORDERS/ana_cruz/ORD-1")).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn test_migrate_all_walks_user_profiles() {
  setup_tracing();
  let store = legacy_store().await;
  let reports = Migrator::new(shared(&store)).migrate_all().await.unwrap();
  assert_eq!(reports.len(), 1);
  assert_eq!(reports[0].uid, UID);
  assert_eq!(reports[0].orders_moved, 2);
}

#[tokio::test]
#[serial]
async fn test_orders_under_a_previous_name_are_moved() {
  setup_tracing();
  let store = memory_store();
  store
    .set(
      &paths::order("ana_santos", "ORD-OLD"),
      json!({ "orderId": "ORD-OLD", "userId": UID, "status": "TO_SHIP", "items": [] }),
    )
    .await
    .unwrap();
  store
    .set(
      &paths::order("ana_santos", "ORD-BO"),
      json!({ "orderId": "ORD-BO", "userId": "uid-bo-0002", "status": "shipped", "items": [] }),
    )
    .await
    .unwrap();

  // Ana is now "Ana Cruz", so her current slug folder is `ana_cruz`.
  let report = Migrator::new(shared(&store)).migrate_user(&ana()).await.unwrap();
  assert_eq!(report.orders_moved, 1);

  let moved = store.get(&paths::order(UID, "ORD-OLD")).await.unwrap().unwrap();
  assert_eq!(moved["status"], json!(OrderStatus::Processing.as_str()));
  assert!(store.get(&paths::order("ana_santos", "ORD-OLD")).await.unwrap().is_none());
  assert!(store.get(&paths::order("ana_santos", "ORD-BO")).await.unwrap().is_some());
}
