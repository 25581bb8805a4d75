// storefront/src/error.rs
use anyhow::Error as AnyhowError;
use serde::Serialize;
use thiserror::Error;

use crate::model::status::OrderStatus;

/// Why a line item failed the stock check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ViolationReason {
  /// No record exists under `TBL_PRODUCTS/<productId>`.
  NotFound,
  /// The product exists but `stock < requested`.
  Insufficient { current_stock: i64, requested: u32 },
}

/// One line item that cannot be fulfilled from current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockViolation {
  pub product_id: String,
  pub name: String,
  #[serde(flatten)]
  pub reason: ViolationReason,
}

impl std::fmt::Display for StockViolation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.reason {
      ViolationReason::NotFound => write!(f, "{}: Product not found", self.name),
      ViolationReason::Insufficient {
        current_stock,
        requested,
      } => write!(
        f,
        "{}: Insufficient stock (Available: {}, Requested: {})",
        self.name, current_stock, requested
      ),
    }
  }
}

fn join_violations(violations: &[StockViolation]) -> String {
  violations.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error)]
pub enum ShopError {
  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Insufficient stock: {}", join_violations(.0))]
  InsufficientStock(Vec<StockViolation>),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid status transition from '{from}' to '{to}'")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  #[error("Unknown order status '{0}'")]
  InvalidStatus(String),

  #[error("Permission denied for write at '{path}'")]
  PermissionDenied { path: String },

  #[error("Malformed document: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Checkout step '{step}' failed. Source: {source}")]
  Saga {
    step: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Internal storefront error: {0}")]
  Internal(String),
}

impl ShopError {
  /// Violations carried by an insufficient-stock failure, empty for every other variant.
  pub fn violations(&self) -> &[StockViolation] {
    match self {
      ShopError::InsufficientStock(v) => v,
      _ => &[],
    }
  }
}

impl From<AnyhowError> for ShopError {
  fn from(err: AnyhowError) -> Self {
    // Keep a ShopError that travelled through anyhow intact where it can be recovered cheaply.
    match err.downcast::<ShopError>() {
      Ok(shop_err) => shop_err,
      Err(other) => ShopError::Internal(other.to_string()),
    }
  }
}

pub type ShopResult<T, E = ShopError> = std::result::Result<T, E>;

/// Failures reported by an identity provider, mapped to user-facing text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("user not found")]
  UserNotFound,
  #[error("wrong password")]
  WrongPassword,
  #[error("email already in use")]
  EmailAlreadyInUse,
  #[error("weak password (minimum {min_length} characters)")]
  WeakPassword { min_length: usize },
  #[error("invalid email")]
  InvalidEmail,
  #[error("not signed in")]
  NotSignedIn,
  #[error("authentication failed: {0}")]
  Other(String),
}

impl AuthError {
  /// Maps a provider error code (e.g. `auth/user-not-found`) to an `AuthError`.
  pub fn from_provider_code(code: &str) -> Self {
    match code {
      "auth/user-not-found" => AuthError::UserNotFound,
      "auth/wrong-password" | "auth/invalid-credential" => AuthError::WrongPassword,
      "auth/email-already-in-use" => AuthError::EmailAlreadyInUse,
      "auth/weak-password" => AuthError::WeakPassword { min_length: 6 },
      "auth/invalid-email" => AuthError::InvalidEmail,
      other => AuthError::Other(other.to_string()),
    }
  }

  /// The provider code this error corresponds to.
  pub fn code(&self) -> &'static str {
    match self {
      AuthError::UserNotFound => "auth/user-not-found",
      AuthError::WrongPassword => "auth/wrong-password",
      AuthError::EmailAlreadyInUse => "auth/email-already-in-use",
      AuthError::WeakPassword { .. } => "auth/weak-password",
      AuthError::InvalidEmail => "auth/invalid-email",
      AuthError::NotSignedIn => "auth/not-signed-in",
      AuthError::Other(_) => "auth/unknown",
    }
  }

  pub fn user_message(&self) -> String {
    match self {
      AuthError::UserNotFound => "No account found with this email".to_string(),
      AuthError::WrongPassword => "Incorrect password".to_string(),
      AuthError::EmailAlreadyInUse => "An account with this email already exists".to_string(),
      AuthError::WeakPassword { min_length } => {
        format!("Password should be at least {} characters", min_length)
      }
      AuthError::InvalidEmail => "Invalid email address".to_string(),
      AuthError::NotSignedIn => "Please sign in to continue".to_string(),
      AuthError::Other(_) => "Authentication failed".to_string(),
    }
  }
}
