// storefront/src/checkout/placement.rs

//! Turns a reviewed checkout into a durable order. Each stage is a saga step, so a
//! failure after the order exists rolls stock back and cancels the order.

use serde::Serialize;
use std::sync::Arc;
use tracing::{event, instrument, Level};

use super::session::{CheckoutSession, OrderReviewDraft, PaymentSubmission};
use crate::cart::CartBinding;
use crate::error::{ShopError, ShopResult};
use crate::identity::Identity;
use crate::model::{NewOrder, OrderStatus};
use crate::orders::{OrderManager, StockChange};
use crate::saga::{Saga, SagaContext};
use crate::store::{paths, WriteBatch};

/// State shared by the placement steps.
pub struct PlacementContext {
  pub identity: Identity,
  pub draft: OrderReviewDraft,
  pub submission: Option<PaymentSubmission>,
  pub session: CheckoutSession,
  pub cart: Option<Arc<CartBinding>>,
  pub order_id: Option<String>,
  pub stock_changes: Vec<StockChange>,
  pub cart_cleared: bool,
  pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
  pub order_id: String,
  pub owner: String,
  pub status: OrderStatus,
  pub stock_changes: Vec<StockChange>,
  pub cart_cleared: bool,
}

/// Stores the failure text where compensations can read it, then hands the error back.
fn noting_failure<T>(ctx: &SagaContext<PlacementContext>, result: ShopResult<T>) -> ShopResult<T> {
  if let Err(err) = &result {
    ctx.write().failure = Some(err.to_string());
  }
  result
}

pub struct OrderPlacement {
  manager: OrderManager,
  saga: Saga<PlacementContext>,
}

impl OrderPlacement {
  pub fn new(manager: OrderManager) -> Self {
    let mut saga: Saga<PlacementContext> = Saga::new(
      "place_order",
      &[
        ("validate_stock", false, None),
        ("create_order", false, None),
        (
          "submit_payment",
          false,
          Some(Arc::new(|ctx: SagaContext<PlacementContext>| {
            !ctx.read().draft.payment_method.is_digital()
          })),
        ),
        ("decrement_stock", false, None),
        ("clear_cart", true, None),
        ("clear_session", false, None),
      ],
    );

    let m = manager.clone();
    saga.on_step("validate_stock", move |ctx: SagaContext<PlacementContext>| {
      let manager = m.clone();
      async move {
        let items = ctx.read().draft.items.clone();
        let violations = manager.check_stock(&items).await?;
        if violations.is_empty() {
          Ok::<_, ShopError>(())
        } else {
          Err(ShopError::InsufficientStock(violations))
        }
      }
    });

    let m = manager.clone();
    saga.on_step("create_order", move |ctx: SagaContext<PlacementContext>| {
      let manager = m.clone();
      async move {
        let new_order = {
          let guard = ctx.read();
          NewOrder {
            user_id: guard.identity.uid.clone(),
            user_email: guard.identity.email_or_empty().to_string(),
            user_name: guard.identity.user_name(),
            items: guard.draft.items.clone(),
            shipping: guard.draft.shipping.clone(),
            payment_method: guard.draft.payment_method,
          }
        };
        let order_id = noting_failure(&ctx, manager.create_order(new_order).await)?;
        ctx.write().order_id = Some(order_id);
        Ok::<_, ShopError>(())
      }
    });

    let m = manager.clone();
    saga.compensate("create_order", move |ctx: SagaContext<PlacementContext>| {
      let manager = m.clone();
      async move {
        let (owner, order_id, reason) = {
          let guard = ctx.read();
          (
            guard.identity.uid.clone(),
            guard.order_id.clone(),
            guard.failure.clone().unwrap_or_else(|| "unknown error".to_string()),
          )
        };
        let Some(order_id) = order_id else {
          return Ok::<_, ShopError>(());
        };
        manager
          .update_order_status(
            &owner,
            &order_id,
            OrderStatus::Cancelled,
            &format!("Checkout failed: {}", reason),
          )
          .await?;
        Ok(())
      }
    });

    let m = manager.clone();
    saga.on_step("submit_payment", move |ctx: SagaContext<PlacementContext>| {
      let manager = m.clone();
      async move {
        let (owner, order_id, submission) = {
          let guard = ctx.read();
          (guard.identity.uid.clone(), guard.order_id.clone(), guard.submission.clone())
        };
        let (Some(order_id), Some(submission)) = (order_id, submission) else {
          let err = ShopError::Validation("Payment proof is required for wallet payments".to_string());
          return noting_failure(&ctx, Err(err));
        };
        noting_failure(
          &ctx,
          manager.update_payment_info(&owner, &order_id, &submission).await,
        )?;
        Ok::<_, ShopError>(())
      }
    });

    let m = manager.clone();
    saga.on_step("decrement_stock", move |ctx: SagaContext<PlacementContext>| {
      let manager = m.clone();
      async move {
        let items = ctx.read().draft.items.clone();
        for item in items.iter().filter(|i| !i.is_pre_order) {
          let change = noting_failure(
            &ctx,
            manager.decrement_product_stock(&item.product_id, item.quantity).await,
          )?;
          ctx.write().stock_changes.push(change);
        }
        Ok::<_, ShopError>(())
      }
    });

    let m = manager.clone();
    saga.compensate("decrement_stock", move |ctx: SagaContext<PlacementContext>| {
      let manager = m.clone();
      async move {
        let changes = std::mem::take(&mut ctx.write().stock_changes);
        let mut first_error = None;
        for change in changes.iter().rev() {
          if let Err(err) = manager.restock_product(&change.product_id, change.removed()).await {
            event!(Level::ERROR, product_id = %change.product_id, error = %err, "Restock failed.");
            first_error.get_or_insert(err);
          }
        }
        match first_error {
          Some(err) => Err(err),
          None => Ok::<_, ShopError>(()),
        }
      }
    });

    let m = manager.clone();
    saga.on_step("clear_cart", move |ctx: SagaContext<PlacementContext>| {
      let manager = m.clone();
      async move {
        let (uid, product_ids, binding) = {
          let guard = ctx.read();
          (guard.identity.uid.clone(), guard.draft.product_ids(), guard.cart.clone())
        };
        match binding {
          Some(binding) if binding.is_active() => {
            binding.clear_selected(&product_ids).await?;
          }
          _ => {
            let mut batch = WriteBatch::new();
            for product_id in &product_ids {
              batch.insert(paths::cart(&uid).child(product_id), serde_json::Value::Null);
            }
            manager.store().commit(batch).await?;
          }
        }
        ctx.write().cart_cleared = true;
        Ok::<_, ShopError>(())
      }
    });

    saga.on_step("clear_session", move |ctx: SagaContext<PlacementContext>| async move {
      let guard = ctx.read();
      guard.session.clear_all();
      if let Some(order_id) = &guard.order_id {
        guard.session.record_order(order_id);
      }
      Ok::<_, ShopError>(())
    });

    event!(Level::DEBUG, plan = ?saga.plan(), "Placement saga ready.");
    OrderPlacement { manager, saga }
  }

  pub fn manager(&self) -> &OrderManager {
    &self.manager
  }

  pub fn plan(&self) -> Vec<String> {
    self.saga.plan()
  }

  /// Places the order staged in `session`. Wallet payments need `submission`; it is
  /// validated before anything is written.
  #[instrument(name = "OrderPlacement::place", skip_all, fields(uid = %identity.uid))]
  pub async fn place(
    &self,
    identity: &Identity,
    session: &CheckoutSession,
    cart: Option<Arc<CartBinding>>,
    submission: Option<PaymentSubmission>,
  ) -> ShopResult<PlacedOrder> {
    let draft = session
      .review_draft()
      .ok_or_else(|| ShopError::Validation("No payment data found. Please start over.".to_string()))?;

    let submission = if draft.payment_method.is_digital() {
      let mut submission = submission
        .ok_or_else(|| ShopError::Validation("Reference number is required".to_string()))?;
      submission.method = draft.payment_method;
      submission.validate()?;
      Some(submission)
    } else {
      None
    };

    let ctx = SagaContext::new(PlacementContext {
      identity: identity.clone(),
      draft,
      submission,
      session: session.clone(),
      cart,
      order_id: None,
      stock_changes: Vec::new(),
      cart_cleared: false,
      failure: None,
    });

    self.saga.run(ctx.clone()).await?;
    let guard = ctx.read();
    let order_id = guard
      .order_id
      .clone()
      .ok_or_else(|| ShopError::Internal("placement ended without an order".to_string()))?;
    let status = if guard.draft.payment_method.is_digital() {
      OrderStatus::PaymentSubmitted
    } else {
      OrderStatus::PendingPayment
    };
    event!(Level::INFO, order_id = %order_id, cart_cleared = guard.cart_cleared, "Order placed.");

    Ok(PlacedOrder {
      order_id,
      owner: guard.identity.uid.clone(),
      status,
      stock_changes: guard.stock_changes.clone(),
      cart_cleared: guard.cart_cleared,
    })
  }
}
