// storefront/src/checkout/mod.rs

pub mod placement;
pub mod session;

use serde::{Deserialize, Serialize};

use crate::model::ShippingKind;
use crate::money::Money;

pub use placement::{OrderPlacement, PlacedOrder, PlacementContext};
pub use session::{
  validate_review, CheckoutSelection, CheckoutSession, CheckoutState, NextStep, OrderReviewDraft, PaymentDraft,
  PaymentSubmission,
};

/// Fees charged per shipping kind. Both default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSettings {
  pub delivery_fee: Money,
  pub pickup_fee: Money,
}

impl CheckoutSettings {
  pub fn fee_for(&self, kind: ShippingKind) -> Money {
    match kind {
      ShippingKind::Delivery => self.delivery_fee,
      ShippingKind::Pickup => self.pickup_fee,
    }
  }
}
