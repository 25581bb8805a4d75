// storefront_server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront::{AuthError, ShopError, StockViolation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Insufficient stock for {} item(s)", .0.len())]
  InsufficientStock(Vec<StockViolation>),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<ShopError> for AppError {
  fn from(err: ShopError) -> Self {
    match err {
      ShopError::Validation(m) => AppError::Validation(m),
      ShopError::InvalidStatus(_) => AppError::Validation(err.to_string()),
      ShopError::InsufficientStock(violations) => AppError::InsufficientStock(violations),
      ShopError::NotFound(m) => AppError::NotFound(m),
      ShopError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
      ShopError::PermissionDenied { .. } => AppError::Forbidden(err.to_string()),
      ShopError::Serialization(_) | ShopError::Saga { .. } | ShopError::Internal(_) => {
        AppError::Internal(err.to_string())
      }
    }
  }
}

impl From<AuthError> for AppError {
  fn from(err: AuthError) -> Self {
    match err {
      AuthError::WeakPassword { .. } | AuthError::InvalidEmail => AppError::Validation(err.user_message()),
      AuthError::EmailAlreadyInUse => AppError::Conflict(err.user_message()),
      AuthError::UserNotFound | AuthError::WrongPassword | AuthError::NotSignedIn | AuthError::Other(_) => {
        AppError::Auth(err.user_message())
      }
    }
  }
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience (seed loading)
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<ShopError>() {
      Ok(shop_err) => shop_err.into(),
      Err(other) => AppError::Internal(format!("{:#}", other)),
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::InsufficientStock(violations) => {
        let message = violations.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        HttpResponse::BadRequest().json(json!({
          "error": format!("Insufficient stock: {}", message),
          "violations": violations,
        }))
      }
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::Forbidden(m) => HttpResponse::Forbidden().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::Config(m) => {
        // Log the full error when it's turned into a response
        tracing::error!(application_error = %self, "Responding with error");
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Internal(m) => {
        tracing::error!(application_error = %self, "Responding with error");
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;
  use storefront::{OrderStatus, ViolationReason};

  #[test]
  fn shop_errors_map_to_status_codes() {
    let cases = [
      (ShopError::Validation("bad".into()), StatusCode::BAD_REQUEST),
      (ShopError::NotFound("order".into()), StatusCode::NOT_FOUND),
      (
        ShopError::InvalidTransition {
          from: OrderStatus::Completed,
          to: OrderStatus::Cancelled,
        },
        StatusCode::CONFLICT,
      ),
      (
        ShopError::PermissionDenied {
          path: "/TBL_PRODUCTS".into(),
        },
        StatusCode::FORBIDDEN,
      ),
      (ShopError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
      assert_eq!(AppError::from(err).error_response().status(), expected);
    }
  }

  #[test]
  fn auth_errors_use_user_facing_text() {
    let err = AppError::from(AuthError::WrongPassword);
    assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    assert!(matches!(err, AppError::Auth(ref m) if m == "Incorrect password"));
    assert!(matches!(
      AppError::from(AuthError::WeakPassword { min_length: 8 }),
      AppError::Validation(ref m) if m == "Password should be at least 8 characters"
    ));
    assert!(matches!(AppError::from(AuthError::EmailAlreadyInUse), AppError::Conflict(_)));
  }

  #[test]
  fn insufficient_stock_is_a_bad_request() {
    let err = AppError::from(ShopError::InsufficientStock(vec![StockViolation {
      product_id: "P1".into(),
      name: "Booster Box".into(),
      reason: ViolationReason::Insufficient {
        current_stock: 2,
        requested: 3,
      },
    }]));
    assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
  }
}
