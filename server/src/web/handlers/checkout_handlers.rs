// storefront_server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront::{PaymentMethod, PaymentSubmission, ShippingSelection};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedSession;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestPayload {
  pub shipping: ShippingSelection,
  pub payment_method: PaymentMethod,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderPayload {
  #[serde(default)]
  pub reference_id: Option<String>,
  #[serde(default)]
  pub proof_base64: Option<String>,
}

// --- Handler Implementations ---

/// Validates shipping and payment, stores the review draft and says what comes next.
#[instrument(name = "handler::review_checkout", skip_all, fields(uid = %auth.0.identity.uid, method = %req_payload.payment_method))]
pub async fn review_handler(
  req_payload: web::Json<ReviewRequestPayload>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let checkout = &auth.0.checkout;
  checkout.review(payload.shipping, payload.payment_method)?;
  let next = checkout.stage_payment_method()?;
  Ok(HttpResponse::Ok().json(next))
}

#[instrument(name = "handler::place_order", skip_all, fields(uid = %auth.0.identity.uid))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  req_payload: Option<web::Json<PlaceOrderPayload>>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let session = auth.0;
  let payload = req_payload.map(web::Json::into_inner).unwrap_or_default();
  let method = session
    .checkout
    .review_draft()
    .map(|draft| draft.payment_method)
    .ok_or_else(|| AppError::Validation("No payment data found. Please start over.".to_string()))?;

  let submission = match (payload.reference_id, payload.proof_base64) {
    (None, None) => None,
    (reference_id, proof_base64) => Some(PaymentSubmission {
      method,
      reference_id: reference_id.unwrap_or_default(),
      proof_base64: proof_base64.unwrap_or_default(),
    }),
  };

  let placed = app_state
    .placement
    .place(&session.identity, &session.checkout, session.cart().ok(), submission)
    .await
    .inspect_err(|err| warn!(error = %err, "Order placement failed."))?;

  info!(order_id = %placed.order_id, status = %placed.status, "Order placed.");
  Ok(HttpResponse::Created().json(json!({ "order": placed })))
}

pub async fn get_session_handler(auth: AuthenticatedSession) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(auth.0.checkout.snapshot()))
}

pub async fn clear_session_handler(auth: AuthenticatedSession) -> Result<HttpResponse, AppError> {
  auth.0.checkout.clear_all();
  Ok(HttpResponse::NoContent().finish())
}
