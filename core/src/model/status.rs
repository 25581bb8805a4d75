// storefront/src/model/status.rs

//! The single order-status vocabulary, its normalization layer and the transition table.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ShopError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  PendingPayment,
  UnderReview,
  PaymentSubmitted,
  PaymentVerified,
  PaymentRejected,
  Processing,
  ReadyForPickup,
  Shipped,
  Delivered,
  Completed,
  Cancelled,
  Refunded,
}

use OrderStatus::*;

impl OrderStatus {
  pub const ALL: [OrderStatus; 12] = [
    PendingPayment,
    UnderReview,
    PaymentSubmitted,
    PaymentVerified,
    PaymentRejected,
    Processing,
    ReadyForPickup,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      PendingPayment => "pending_payment",
      UnderReview => "under_review",
      PaymentSubmitted => "payment_submitted",
      PaymentVerified => "payment_verified",
      PaymentRejected => "payment_rejected",
      Processing => "processing",
      ReadyForPickup => "ready_for_pickup",
      Shipped => "shipped",
      Delivered => "delivered",
      Completed => "completed",
      Cancelled => "cancelled",
      Refunded => "refunded",
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      PendingPayment => "Pending Payment",
      UnderReview => "Under Review",
      PaymentSubmitted => "Payment Submitted",
      PaymentVerified => "Payment Verified",
      PaymentRejected => "Payment Rejected",
      Processing => "Processing",
      ReadyForPickup => "Ready for Pickup",
      Shipped => "Shipped",
      Delivered => "Delivered",
      Completed => "Completed",
      Cancelled => "Cancelled",
      Refunded => "Refunded",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, Completed | Cancelled | Refunded)
  }

  pub fn allowed_next(self) -> &'static [OrderStatus] {
    match self {
      PendingPayment => &[PaymentSubmitted, Processing, Cancelled],
      UnderReview => &[PaymentVerified, PaymentRejected, Cancelled],
      PaymentSubmitted => &[PaymentVerified, PaymentRejected, Cancelled],
      PaymentVerified => &[Processing, Cancelled, Refunded],
      PaymentRejected => &[PaymentSubmitted, Cancelled],
      Processing => &[ReadyForPickup, Shipped, Cancelled, Refunded],
      ReadyForPickup => &[Completed, Cancelled],
      Shipped => &[Delivered],
      Delivered => &[Completed, Refunded],
      Completed | Cancelled | Refunded => &[],
    }
  }

  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    self.allowed_next().contains(&next)
  }

  /// `Ok` when `self -> next` is in the transition table.
  pub fn check_transition(self, next: OrderStatus) -> Result<(), ShopError> {
    if self.can_transition_to(next) {
      Ok(())
    } else {
      Err(ShopError::InvalidTransition { from: self, to: next })
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = ShopError;

  /// Accepts the canonical snake_case spelling in any case plus the legacy
  /// upper-case admin vocabulary.
  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let lowered = raw.trim().to_ascii_lowercase();
    let status = match lowered.as_str() {
      "pending_payment" => PendingPayment,
      "under_review" => UnderReview,
      "payment_submitted" => PaymentSubmitted,
      "payment_verified" => PaymentVerified,
      "payment_rejected" | "proof_declined" => PaymentRejected,
      "processing" | "to_ship" => Processing,
      "ready_for_pickup" | "ready_to_pickup" => ReadyForPickup,
      "shipped" => Shipped,
      "delivered" => Delivered,
      "completed" => Completed,
      "cancelled" => Cancelled,
      "refunded" => Refunded,
      _ => return Err(ShopError::InvalidStatus(raw.to_string())),
    };
    Ok(status)
  }
}

impl<'de> Deserialize<'de> for OrderStatus {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn legacy_vocabulary_normalizes() {
    assert_eq!("PROOF_DECLINED".parse::<OrderStatus>().unwrap(), PaymentRejected);
    assert_eq!("TO_SHIP".parse::<OrderStatus>().unwrap(), Processing);
    assert_eq!("READY_TO_PICKUP".parse::<OrderStatus>().unwrap(), ReadyForPickup);
    assert_eq!("Payment_Verified".parse::<OrderStatus>().unwrap(), PaymentVerified);
    assert!(matches!(
      "lost_in_transit".parse::<OrderStatus>(),
      Err(ShopError::InvalidStatus(_))
    ));
  }

  #[test]
  fn terminal_states_allow_nothing() {
    for status in OrderStatus::ALL.iter().filter(|s| s.is_terminal()) {
      assert!(status.allowed_next().is_empty());
    }
    assert!(Shipped.can_transition_to(Delivered));
    assert!(!Shipped.can_transition_to(Cancelled));
  }

  #[test]
  fn serializes_snake_case() {
    assert_eq!(serde_json::to_value(ReadyForPickup).unwrap(), "ready_for_pickup");
    let parsed: OrderStatus = serde_json::from_value(serde_json::json!("COMPLETED")).unwrap();
    assert_eq!(parsed, Completed);
  }
}
