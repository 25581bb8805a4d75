// storefront/src/orders/admin.rs

//! Back-office operations on top of [`OrderManager`].

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{event, instrument, Level};

use super::manager::{apply_transition, verify_in_place, OrderManager};
use crate::error::{ShopError, ShopResult};
use crate::model::{Order, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
  pub total: usize,
  /// Every status is present, zero when unused.
  pub by_status: BTreeMap<OrderStatus, usize>,
}

impl OrderStatistics {
  pub fn count(&self, status: OrderStatus) -> usize {
    self.by_status.get(&status).copied().unwrap_or(0)
  }
}

impl OrderManager {
  /// Verifies the payment and moves the order on to `processing` in the same write.
  #[instrument(name = "OrderManager::approve_payment", skip(self))]
  pub async fn approve_payment(&self, owner: &str, order_id: &str, admin_id: &str) -> ShopResult<Order> {
    let verify_key = self.store.generate_key();
    let processing_key = self.store.generate_key();
    let admin_id = admin_id.to_string();
    let order = self
      .mutate_order(owner, order_id, move |order, now| {
        verify_in_place(order, &admin_id, true, verify_key, now)?;
        apply_transition(
          order,
          OrderStatus::Processing,
          "Payment verified, order being prepared",
          processing_key,
          now,
        )
      })
      .await?;
    event!(Level::INFO, order_id, "Payment approved.");
    Ok(order)
  }

  pub async fn reject_payment(&self, owner: &str, order_id: &str, admin_id: &str) -> ShopResult<Order> {
    self.verify_payment(owner, order_id, admin_id, false).await
  }

  /// Also stamps `admin.assignedTo` and `admin.lastReviewed`.
  #[instrument(name = "OrderManager::mark_ready_for_pickup", skip(self))]
  pub async fn mark_ready_for_pickup(&self, owner: &str, order_id: &str, admin_id: &str) -> ShopResult<Order> {
    let key = self.store.generate_key();
    let admin_id = admin_id.to_string();
    self
      .mutate_order(owner, order_id, move |order, now| {
        apply_transition(
          order,
          OrderStatus::ReadyForPickup,
          "Order ready for customer pickup",
          key,
          now,
        )?;
        order.admin.assigned_to = Some(admin_id);
        order.admin.last_reviewed = Some(now);
        Ok(())
      })
      .await
  }

  pub async fn mark_shipped(&self, owner: &str, order_id: &str, tracking_number: Option<&str>) -> ShopResult<Order> {
    let note = match tracking_number.map(str::trim).filter(|t| !t.is_empty()) {
      Some(tracking) => format!("Order shipped with tracking: {}", tracking),
      None => "Order shipped".to_string(),
    };
    self.update_order_status(owner, order_id, OrderStatus::Shipped, &note).await
  }

  pub async fn mark_delivered(&self, owner: &str, order_id: &str) -> ShopResult<Order> {
    self
      .update_order_status(owner, order_id, OrderStatus::Delivered, "Order delivered")
      .await
  }

  pub async fn mark_completed(&self, owner: &str, order_id: &str) -> ShopResult<Order> {
    self
      .update_order_status(owner, order_id, OrderStatus::Completed, "Order completed successfully")
      .await
  }

  pub async fn cancel(&self, owner: &str, order_id: &str, reason: Option<&str>) -> ShopResult<Order> {
    let note = match reason.map(str::trim).filter(|r| !r.is_empty()) {
      Some(reason) => format!("Order cancelled: {}", reason),
      None => "Order cancelled by admin".to_string(),
    };
    self.update_order_status(owner, order_id, OrderStatus::Cancelled, &note).await
  }

  pub async fn refund(&self, owner: &str, order_id: &str, reason: Option<&str>) -> ShopResult<Order> {
    let note = match reason.map(str::trim).filter(|r| !r.is_empty()) {
      Some(reason) => format!("Order refunded: {}", reason),
      None => "Order refunded".to_string(),
    };
    self.update_order_status(owner, order_id, OrderStatus::Refunded, &note).await
  }

  /// Replaces the admin note and stamps `lastReviewed`. The status is left alone.
  #[instrument(name = "OrderManager::add_admin_note", skip(self, note))]
  pub async fn add_admin_note(&self, owner: &str, order_id: &str, note: &str) -> ShopResult<Order> {
    if note.trim().is_empty() {
      return Err(ShopError::Validation("Note cannot be empty".to_string()));
    }
    let note = note.trim().to_string();
    self
      .mutate_order(owner, order_id, move |order, now| {
        order.admin.notes = note;
        order.admin.last_reviewed = Some(now);
        Ok(())
      })
      .await
  }

  pub async fn statistics(&self) -> ShopResult<OrderStatistics> {
    let records = self.all_orders().await?;
    let mut by_status: BTreeMap<OrderStatus, usize> = OrderStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for record in &records {
      *by_status.entry(record.order.status).or_insert(0) += 1;
    }
    Ok(OrderStatistics {
      total: records.len(),
      by_status,
    })
  }
}
