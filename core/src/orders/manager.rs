// storefront/src/orders/manager.rs

//! Order creation, transition-checked updates, stock bookkeeping and queries.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{event, instrument, Level};

use super::id::OrderId;
use crate::checkout::{CheckoutSettings, PaymentSubmission};
use crate::error::{ShopError, ShopResult, StockViolation, ViolationReason};
use crate::model::{
  AdminBlock, LineItem, NewOrder, Order, OrderStatus, Payment, PaymentStatus, Timeline, TimelineEntry, Totals,
};
use crate::store::tree::{as_i64_lenient, children};
use crate::store::{paths, Origin, SharedStore};

pub(crate) fn now_millis() -> i64 {
  Utc::now().timestamp_millis()
}

/// An order together with the key it is stored under (`TBL_ORDERS/<owner>/<orderId>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
  pub owner: String,
  #[serde(flatten)]
  pub order: Order,
}

/// Result of one stock write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevels {
  pub previous: i64,
  pub current: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
  pub product_id: String,
  pub previous: i64,
  pub current: i64,
}

impl StockChange {
  /// Units actually removed (less than requested when stock hit zero).
  pub fn removed(&self) -> i64 {
    (self.previous - self.current).max(0)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
  pub status: Option<OrderStatus>,
  /// Case-insensitive match against the order id or any item name.
  pub text: Option<String>,
}

impl OrderQuery {
  pub fn matches(&self, order: &Order) -> bool {
    if let Some(status) = self.status {
      if order.status != status {
        return false;
      }
    }
    match self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      None => true,
      Some(text) => {
        let needle = text.to_lowercase();
        order.order_id.to_lowercase().contains(&needle)
          || order.items.iter().any(|item| item.name.to_lowercase().contains(&needle))
      }
    }
  }
}

/// Applies `to` on top of `order.status`, appending the matching timeline entry.
pub(crate) fn apply_transition(
  order: &mut Order,
  to: OrderStatus,
  note: impl Into<String>,
  timeline_key: String,
  now: i64,
) -> ShopResult<()> {
  order.status.check_transition(to)?;
  order.status = to;
  order.timeline.push(
    timeline_key,
    TimelineEntry {
      status: to.as_str().to_string(),
      timestamp: now,
      note: note.into(),
    },
  );
  Ok(())
}

#[derive(Clone)]
pub struct OrderManager {
  pub(crate) store: SharedStore,
  settings: CheckoutSettings,
}

impl OrderManager {
  pub fn new(store: SharedStore) -> Self {
    OrderManager {
      store,
      settings: CheckoutSettings::default(),
    }
  }

  pub fn with_settings(mut self, settings: CheckoutSettings) -> Self {
    self.settings = settings;
    self
  }

  pub fn settings(&self) -> &CheckoutSettings {
    &self.settings
  }

  pub fn store(&self) -> &SharedStore {
    &self.store
  }

  /// Every line that cannot be served from current stock. Pre-orders are exempt.
  #[instrument(name = "OrderManager::check_stock", skip_all, fields(items = items.len()))]
  pub async fn check_stock(&self, items: &[LineItem]) -> ShopResult<Vec<StockViolation>> {
    let mut violations = Vec::new();
    for item in items.iter().filter(|i| !i.is_pre_order) {
      let record = match paths::checked_product(&item.product_id) {
        Ok(path) => self.store.get(&path).await?,
        Err(_) => None,
      };
      let reason = match record {
        None => Some(ViolationReason::NotFound),
        Some(record) => {
          let current_stock = as_i64_lenient(record.get("stock")).unwrap_or(0);
          (current_stock < i64::from(item.quantity)).then_some(ViolationReason::Insufficient {
            current_stock,
            requested: item.quantity,
          })
        }
      };
      if let Some(reason) = reason {
        violations.push(StockViolation {
          product_id: item.product_id.clone(),
          name: item.name.clone(),
          reason,
        });
      }
    }
    if !violations.is_empty() {
      event!(Level::INFO, violations = violations.len(), "Stock check failed.");
    }
    Ok(violations)
  }

  /// Validates stock and persists the complete order document in one write.
  #[instrument(name = "OrderManager::create_order", skip_all, fields(user_id = %new_order.user_id))]
  pub async fn create_order(&self, new_order: NewOrder) -> ShopResult<String> {
    if new_order.user_id.trim().is_empty() {
      return Err(ShopError::Validation("Order must belong to a signed-in user".to_string()));
    }
    if new_order.items.is_empty() {
      return Err(ShopError::Validation("Order must contain at least one item".to_string()));
    }
    if let Some(item) = new_order.items.iter().find(|i| i.quantity == 0) {
      return Err(ShopError::Validation(format!("Quantity for {} must be at least 1", item.name)));
    }

    let violations = self.check_stock(&new_order.items).await?;
    if !violations.is_empty() {
      return Err(ShopError::InsufficientStock(violations));
    }

    let order_id = OrderId::generate().into_string();
    let now = now_millis();
    let mut timeline = Timeline::new();
    timeline.push(
      self.store.generate_key(),
      TimelineEntry {
        status: "order_created".to_string(),
        timestamp: now,
        note: "Order created and awaiting payment".to_string(),
      },
    );

    let fee = self.settings.fee_for(new_order.shipping.kind());
    let order = Order {
      order_id: order_id.clone(),
      totals: Totals::from_items(&new_order.items, fee),
      user_id: new_order.user_id,
      user_email: new_order.user_email,
      user_name: new_order.user_name,
      status: OrderStatus::PendingPayment,
      created_at: now,
      updated_at: now,
      items: new_order.items,
      shipping: new_order.shipping,
      payment: Payment::pending(new_order.payment_method),
      timeline,
      admin: AdminBlock::default(),
    };

    self
      .store
      .set(&paths::order(&order.user_id, &order_id), serde_json::to_value(&order)?)
      .await?;
    event!(Level::INFO, order_id = %order_id, grand_total = %order.totals.grand_total, "Order created.");
    Ok(order_id)
  }

  /// Runs `mutate` on the stored order inside one transaction and bumps `updatedAt`.
  pub(crate) async fn mutate_order<F>(&self, owner: &str, order_id: &str, mutate: F) -> ShopResult<Order>
  where
    F: FnOnce(&mut Order, i64) -> ShopResult<()> + Send + 'static,
  {
    let path = paths::checked_order(owner, order_id)?;
    let missing = format!("order '{}' for '{}'", order_id, owner);
    let missing_after = missing.clone();

    let committed = self
      .store
      .transaction(
        &path,
        Origin::ANONYMOUS,
        Box::new(move |current: Option<Value>| {
          let current = current.ok_or(ShopError::NotFound(missing))?;
          let mut order: Order = serde_json::from_value(current)?;
          let now = now_millis();
          mutate(&mut order, now)?;
          order.updated_at = now;
          Ok(Some(serde_json::to_value(&order)?))
        }),
      )
      .await?;

    let value = committed.ok_or(ShopError::NotFound(missing_after))?;
    Ok(serde_json::from_value(value)?)
  }

  /// Moves the order to `status` if the transition table allows it; status, `updatedAt`
  /// and the timeline entry change together.
  #[instrument(name = "OrderManager::update_order_status", skip_all, fields(owner = %owner, order_id = %order_id, status = %status))]
  pub async fn update_order_status(
    &self,
    owner: &str,
    order_id: &str,
    status: OrderStatus,
    note: &str,
  ) -> ShopResult<Order> {
    let key = self.store.generate_key();
    let note = note.to_string();
    let order = self
      .mutate_order(owner, order_id, move |order, now| apply_transition(order, status, note, key, now))
      .await?;
    event!(Level::INFO, order_id, status = %order.status, "Order status updated.");
    Ok(order)
  }

  /// Attaches wallet payment proof and moves the order to `payment_submitted`.
  #[instrument(name = "OrderManager::update_payment_info", skip(self, submission), fields(method = %submission.method))]
  pub async fn update_payment_info(
    &self,
    owner: &str,
    order_id: &str,
    submission: &PaymentSubmission,
  ) -> ShopResult<Order> {
    submission.validate()?;
    if !submission.method.is_digital() {
      return Err(ShopError::Validation(format!(
        "{} payments do not take a payment proof",
        submission.method
      )));
    }

    let key = self.store.generate_key();
    let submission = submission.clone();
    self
      .mutate_order(owner, order_id, move |order, now| {
        let note = format!("Payment proof submitted via {}", submission.method);
        apply_transition(order, OrderStatus::PaymentSubmitted, note, key, now)?;
        order.payment.method = submission.method;
        order.payment.reference_id = submission.reference_id.trim().to_string();
        order.payment.proof_base64 = submission.proof_base64;
        order.payment.status = PaymentStatus::Submitted;
        Ok(())
      })
      .await
  }

  /// Records an admin's decision on submitted payment proof.
  #[instrument(name = "OrderManager::verify_payment", skip(self))]
  pub async fn verify_payment(&self, owner: &str, order_id: &str, admin_id: &str, approved: bool) -> ShopResult<Order> {
    let key = self.store.generate_key();
    let admin_id = admin_id.to_string();
    self
      .mutate_order(owner, order_id, move |order, now| {
        verify_in_place(order, &admin_id, approved, key, now)
      })
      .await
  }

  /// Lowers a product's stock by `quantity`, never below zero.
  #[instrument(name = "OrderManager::decrement_product_stock", skip(self))]
  pub async fn decrement_product_stock(&self, product_id: &str, quantity: u32) -> ShopResult<StockChange> {
    let levels = self
      .adjust_stock(product_id, move |current| (current - i64::from(quantity)).max(0))
      .await?;
    event!(
      Level::INFO,
      product_id,
      previous = levels.previous,
      current = levels.current,
      "Stock decremented."
    );
    Ok(StockChange {
      product_id: product_id.to_string(),
      previous: levels.previous,
      current: levels.current,
    })
  }

  /// Decrements each line in order, stopping at the first failure.
  pub async fn update_multiple_product_stock(&self, items: &[LineItem]) -> ShopResult<Vec<StockChange>> {
    let mut changes = Vec::with_capacity(items.len());
    for item in items {
      changes.push(self.decrement_product_stock(&item.product_id, item.quantity).await?);
    }
    Ok(changes)
  }

  /// Adds `quantity` back to a product's stock.
  #[instrument(name = "OrderManager::restock_product", skip(self))]
  pub async fn restock_product(&self, product_id: &str, quantity: i64) -> ShopResult<StockChange> {
    let levels = self
      .adjust_stock(product_id, move |current| current.saturating_add(quantity.max(0)))
      .await?;
    Ok(StockChange {
      product_id: product_id.to_string(),
      previous: levels.previous,
      current: levels.current,
    })
  }

  async fn adjust_stock(&self, product_id: &str, next: impl FnOnce(i64) -> i64 + Send + 'static) -> ShopResult<StockLevels> {
    let observed: Arc<Mutex<Option<StockLevels>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&observed);
    let missing = format!("product '{}'", product_id);

    self
      .store
      .transaction(
        &paths::checked_product(product_id)?,
        Origin::ANONYMOUS,
        Box::new(move |current: Option<Value>| {
          let mut record = current.ok_or(ShopError::NotFound(missing))?;
          let previous = as_i64_lenient(record.get("stock")).unwrap_or(0);
          let current = next(previous);
          match record.as_object_mut() {
            Some(fields) => {
              fields.insert("stock".to_string(), Value::from(current));
            }
            None => return Err(ShopError::Internal("product record is not an object".to_string())),
          }
          *sink.lock() = Some(StockLevels { previous, current });
          Ok(Some(record))
        }),
      )
      .await?;

    let levels = *observed.lock();
    levels.ok_or_else(|| ShopError::Internal("stock transaction reported no change".to_string()))
  }

  pub async fn get_order(&self, owner: &str, order_id: &str) -> ShopResult<Option<Order>> {
    match self.store.get(&paths::checked_order(owner, order_id)?).await? {
      Some(value) => Ok(Some(serde_json::from_value(value)?)),
      None => Ok(None),
    }
  }

  /// The owner's orders, newest first.
  pub async fn user_orders(&self, owner: &str) -> ShopResult<Vec<Order>> {
    let tree = self.store.get(&paths::orders(owner)).await?;
    let mut orders: Vec<Order> = tree
      .as_ref()
      .map(|value| parse_orders(owner, value).into_iter().map(|r| r.order).collect())
      .unwrap_or_default();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.order_id.cmp(&a.order_id)));
    Ok(orders)
  }

  /// Every order under every owner, newest first.
  #[instrument(name = "OrderManager::all_orders", skip(self))]
  pub async fn all_orders(&self) -> ShopResult<Vec<OrderRecord>> {
    let Some(tree) = self.store.get(&paths::all_orders()).await? else {
      return Ok(Vec::new());
    };
    let mut records = Vec::new();
    for (owner, owned) in children(&tree) {
      if is_order_document(owned) {
        event!(Level::DEBUG, key = %owner, "Skipping unmigrated top-level order.");
        continue;
      }
      records.extend(parse_orders(&owner, owned));
    }
    records.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
    Ok(records)
  }

  pub async fn orders_by_status(&self, status: OrderStatus) -> ShopResult<Vec<OrderRecord>> {
    Ok(self.all_orders().await?.into_iter().filter(|r| r.order.status == status).collect())
  }

  /// Filters one owner's orders, or everyone's when `owner` is `None`.
  pub async fn search(&self, owner: Option<&str>, query: &OrderQuery) -> ShopResult<Vec<OrderRecord>> {
    let records = match owner {
      Some(owner) => self
        .user_orders(owner)
        .await?
        .into_iter()
        .map(|order| OrderRecord {
          owner: owner.to_string(),
          order,
        })
        .collect(),
      None => self.all_orders().await?,
    };
    Ok(records.into_iter().filter(|r| query.matches(&r.order)).collect())
  }
}

pub(crate) fn verify_in_place(order: &mut Order, admin_id: &str, approved: bool, key: String, now: i64) -> ShopResult<()> {
  let (status, note) = if approved {
    (OrderStatus::PaymentVerified, "Payment verified by admin")
  } else {
    (OrderStatus::PaymentRejected, "Payment rejected by admin")
  };
  apply_transition(order, status, note, key, now)?;
  if approved {
    order.payment.status = PaymentStatus::Verified;
    order.payment.verified_at = Some(now);
    order.payment.verified_by = Some(admin_id.to_string());
  } else {
    order.payment.status = PaymentStatus::Rejected;
    order.payment.verified_at = None;
    order.payment.verified_by = None;
  }
  Ok(())
}

/// A top-level legacy order sits directly under `TBL_ORDERS` and carries its own fields.
pub(crate) fn is_order_document(value: &Value) -> bool {
  value.get("orderId").is_some() && value.get("status").is_some_and(Value::is_string)
}

fn parse_orders(owner: &str, owned: &Value) -> Vec<OrderRecord> {
  children(owned)
    .into_iter()
    .filter_map(|(order_id, raw)| match serde_json::from_value::<Order>(raw.clone()) {
      Ok(order) => Some(OrderRecord {
        owner: owner.to_string(),
        order,
      }),
      Err(err) => {
        event!(Level::WARN, owner, order_id = %order_id, error = %err, "Skipping unreadable order.");
        None
      }
    })
    .collect()
}
