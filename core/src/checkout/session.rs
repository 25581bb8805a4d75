// storefront/src/checkout/session.rs

//! Device-local checkout staging: the cart selection, the order-review draft and the
//! wallet payment draft. Nothing here is persisted remotely.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{event, Level};

use super::CheckoutSettings;
use crate::catalog::CartLine;
use crate::error::{ShopError, ShopResult};
use crate::model::{LineItem, PaymentMethod, ShippingKind, ShippingSelection, Totals};
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSelection {
  pub items: Vec<LineItem>,
  pub selected_ids: Vec<String>,
  pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReviewDraft {
  pub items: Vec<LineItem>,
  pub totals: Totals,
  pub shipping: ShippingSelection,
  pub payment_method: PaymentMethod,
}

impl OrderReviewDraft {
  pub fn product_ids(&self) -> Vec<String> {
    self.items.iter().map(|i| i.product_id.clone()).collect()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
  pub method: PaymentMethod,
  pub order: OrderReviewDraft,
}

/// Wallet payment proof supplied by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmission {
  pub method: PaymentMethod,
  #[serde(default)]
  pub reference_id: String,
  #[serde(default)]
  pub proof_base64: String,
}

impl PaymentSubmission {
  pub fn validate(&self) -> ShopResult<()> {
    if self.reference_id.trim().is_empty() {
      return Err(ShopError::Validation("Reference number is required".to_string()));
    }
    if self.proof_base64.trim().is_empty() {
      return Err(ShopError::Validation("Payment screenshot is required".to_string()));
    }
    Ok(())
  }
}

/// What happens after the payment method is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "next", rename_all = "snake_case")]
pub enum NextStep {
  /// Wallet payments collect a reference number and screenshot first.
  SubmitPaymentProof { draft: PaymentDraft },
  /// Cash and store credits go straight to order placement.
  PlaceOrder { draft: OrderReviewDraft },
}

/// Shipping and payment-method rules from the order review page.
pub fn validate_review(shipping: &ShippingSelection, method: PaymentMethod) -> ShopResult<()> {
  match shipping {
    ShippingSelection::Delivery {
      name,
      address,
      city,
      zip,
    } => {
      if [name, address, city, zip].iter().any(|f| f.trim().is_empty()) {
        return Err(ShopError::Validation("Please fill in all delivery address fields".to_string()));
      }
    }
    ShippingSelection::Pickup { name } => {
      if name.trim().is_empty() {
        return Err(ShopError::Validation("Please enter your name for pickup".to_string()));
      }
    }
  }

  match (method, shipping.kind()) {
    (PaymentMethod::Cash, ShippingKind::Delivery) => Err(ShopError::Validation(
      "Cash payment is only available for store pickup".to_string(),
    )),
    (PaymentMethod::Credits, ShippingKind::Delivery) => Err(ShopError::Validation(
      "Store credits are only available for store pickup".to_string(),
    )),
    _ => Ok(()),
  }
}

fn trimmed(shipping: ShippingSelection) -> ShippingSelection {
  match shipping {
    ShippingSelection::Delivery {
      name,
      address,
      city,
      zip,
    } => ShippingSelection::Delivery {
      name: name.trim().to_string(),
      address: address.trim().to_string(),
      city: city.trim().to_string(),
      zip: zip.trim().to_string(),
    },
    ShippingSelection::Pickup { name } => ShippingSelection::Pickup {
      name: name.trim().to_string(),
    },
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutState {
  pub selection: Option<CheckoutSelection>,
  pub review: Option<OrderReviewDraft>,
  pub payment: Option<PaymentDraft>,
  pub last_order_id: Option<String>,
}

/// Cheap to clone; clones share the same staged state.
#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
  settings: CheckoutSettings,
  state: Arc<RwLock<CheckoutState>>,
}

impl CheckoutSession {
  pub fn new(settings: CheckoutSettings) -> Self {
    CheckoutSession {
      settings,
      state: Arc::new(RwLock::new(CheckoutState::default())),
    }
  }

  pub fn settings(&self) -> &CheckoutSettings {
    &self.settings
  }

  /// Stages the chosen cart lines. Replaces any earlier selection and drops the drafts
  /// built from it.
  pub fn stage_selection(&self, lines: &[CartLine], selected_ids: &[String]) -> ShopResult<CheckoutSelection> {
    let wanted: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
    let items: Vec<LineItem> = lines
      .iter()
      .filter(|line| wanted.contains(line.product_id.as_str()))
      .map(CartLine::to_line_item)
      .collect();
    if items.is_empty() {
      return Err(ShopError::Validation("Select at least one item".to_string()));
    }

    let selection = CheckoutSelection {
      total: items.iter().map(LineItem::line_total).sum(),
      selected_ids: items.iter().map(|i| i.product_id.clone()).collect(),
      items,
    };
    let mut state = self.state.write();
    state.selection = Some(selection.clone());
    state.review = None;
    state.payment = None;
    event!(Level::DEBUG, lines = selection.items.len(), total = %selection.total, "Checkout selection staged.");
    Ok(selection)
  }

  /// Validates shipping and payment choices against the staged selection and stores
  /// the resulting order-review draft.
  pub fn review(&self, shipping: ShippingSelection, method: PaymentMethod) -> ShopResult<OrderReviewDraft> {
    let shipping = trimmed(shipping);
    validate_review(&shipping, method)?;

    let mut state = self.state.write();
    let Some(selection) = state.selection.as_ref() else {
      return Err(ShopError::Validation("No items selected. Please go back to cart.".to_string()));
    };
    let fee = self.settings.fee_for(shipping.kind());
    let draft = OrderReviewDraft {
      totals: Totals::from_items(&selection.items, fee),
      items: selection.items.clone(),
      shipping,
      payment_method: method,
    };
    state.review = Some(draft.clone());
    state.payment = None;
    Ok(draft)
  }

  /// Confirms the reviewed payment method.
  pub fn stage_payment_method(&self) -> ShopResult<NextStep> {
    let mut state = self.state.write();
    let Some(review) = state.review.clone() else {
      return Err(ShopError::Validation("No payment data found. Please start over.".to_string()));
    };
    if review.payment_method.is_digital() {
      let draft = PaymentDraft {
        method: review.payment_method,
        order: review,
      };
      state.payment = Some(draft.clone());
      Ok(NextStep::SubmitPaymentProof { draft })
    } else {
      state.payment = None;
      Ok(NextStep::PlaceOrder { draft: review })
    }
  }

  pub fn selection(&self) -> Option<CheckoutSelection> {
    self.state.read().selection.clone()
  }

  pub fn review_draft(&self) -> Option<OrderReviewDraft> {
    self.state.read().review.clone()
  }

  pub fn payment_draft(&self) -> Option<PaymentDraft> {
    self.state.read().payment.clone()
  }

  pub fn last_order_id(&self) -> Option<String> {
    self.state.read().last_order_id.clone()
  }

  pub fn snapshot(&self) -> CheckoutState {
    self.state.read().clone()
  }

  pub fn clear_selection(&self) {
    self.state.write().selection = None;
  }

  pub fn clear_review(&self) {
    self.state.write().review = None;
  }

  pub fn clear_payment(&self) {
    self.state.write().payment = None;
  }

  /// Drops every staged piece. The last placed order id is kept for the confirmation view.
  pub fn clear_all(&self) {
    let mut state = self.state.write();
    state.selection = None;
    state.review = None;
    state.payment = None;
  }

  pub(crate) fn record_order(&self, order_id: &str) {
    self.state.write().last_order_id = Some(order_id.to_string());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(id: &str, price: i64, qty: u32) -> CartLine {
    CartLine {
      product_id: id.to_string(),
      name: format!("Item {}", id),
      price: Money::from_cents(price),
      image: String::new(),
      quantity: qty,
      is_pre_order: false,
    }
  }

  fn delivery(name: &str) -> ShippingSelection {
    ShippingSelection::Delivery {
      name: name.to_string(),
      address: "1 Rizal St".to_string(),
      city: "Manila".to_string(),
      zip: "1000".to_string(),
    }
  }

  #[test]
  fn empty_selection_is_rejected() {
    let session = CheckoutSession::default();
    let err = session.stage_selection(&[line("P1", 100, 1)], &[]).unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Select at least one item");
  }

  #[test]
  fn selection_keeps_only_chosen_lines() {
    let session = CheckoutSession::default();
    let selection = session
      .stage_selection(&[line("P1", 10_000, 2), line("P2", 5_000, 1)], &["P1".to_string()])
      .unwrap();
    assert_eq!(selection.items.len(), 1);
    assert_eq!(selection.total, Money::from_cents(20_000));
  }

  #[test]
  fn cash_requires_pickup() {
    let err = validate_review(&delivery("Ana"), PaymentMethod::Cash).unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Cash payment is only available for store pickup");
    let err = validate_review(&delivery("Ana"), PaymentMethod::Credits).unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Store credits are only available for store pickup");
    assert!(validate_review(&ShippingSelection::Pickup { name: "Ana".into() }, PaymentMethod::Cash).is_ok());
  }

  #[test]
  fn blank_delivery_field_is_rejected() {
    let err = validate_review(&delivery("  "), PaymentMethod::Gcash).unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Please fill in all delivery address fields");
    let err = validate_review(&ShippingSelection::Pickup { name: "".into() }, PaymentMethod::Gcash).unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Please enter your name for pickup");
  }

  #[test]
  fn review_applies_shipping_fee_and_wallets_stage_a_payment_draft() {
    let session = CheckoutSession::new(CheckoutSettings {
      delivery_fee: Money::from_cents(5_000),
      pickup_fee: Money::ZERO,
    });
    session.stage_selection(&[line("P1", 10_000, 1)], &["P1".to_string()]).unwrap();
    let draft = session.review(delivery("Ana"), PaymentMethod::Gcash).unwrap();
    assert_eq!(draft.totals.grand_total, Money::from_cents(15_000));

    match session.stage_payment_method().unwrap() {
      NextStep::SubmitPaymentProof { draft } => assert_eq!(draft.method, PaymentMethod::Gcash),
      other => panic!("unexpected next step {:?}", other),
    }
    assert!(session.payment_draft().is_some());
  }

  #[test]
  fn submission_requires_reference_and_proof() {
    let mut submission = PaymentSubmission {
      method: PaymentMethod::Maya,
      reference_id: "".into(),
      proof_base64: "abc".into(),
    };
    assert_eq!(
      submission.validate().unwrap_err().to_string(),
      "Validation error: Reference number is required"
    );
    submission.reference_id = "REF1".into();
    submission.proof_base64 = " ".into();
    assert_eq!(
      submission.validate().unwrap_err().to_string(),
      "Validation error: Payment screenshot is required"
    );
  }
}
