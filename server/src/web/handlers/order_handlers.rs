// storefront_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront::{PaymentMethod, PaymentSubmission};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedSession;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProofPayload {
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub reference_id: String,
  #[serde(default)]
  pub proof_base64: String,
}

#[instrument(name = "handler::list_orders", skip_all, fields(uid = %auth.0.identity.uid))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.user_orders(&auth.0.identity.uid).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, path, auth), fields(uid = %auth.0.identity.uid, order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  match app_state.orders.get_order(&auth.0.identity.uid, &order_id).await? {
    Some(order) => Ok(HttpResponse::Ok().json(json!({ "order": order }))),
    None => Err(AppError::NotFound(format!("Order {} not found.", order_id))),
  }
}

/// Attaches wallet payment proof to an existing order (first attempt or a resubmission
/// after rejection).
#[instrument(name = "handler::submit_payment", skip(app_state, path, req_payload, auth), fields(uid = %auth.0.identity.uid, order_id = %path.as_ref()))]
pub async fn submit_payment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_payload: web::Json<PaymentProofPayload>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if !payload.payment_method.is_digital() {
    return Err(AppError::Validation(format!(
      "{} payments do not take payment proof",
      payload.payment_method
    )));
  }
  let submission = PaymentSubmission {
    method: payload.payment_method,
    reference_id: payload.reference_id,
    proof_base64: payload.proof_base64,
  };
  submission.validate()?;

  let order = app_state
    .orders
    .update_payment_info(&auth.0.identity.uid, &path.into_inner(), &submission)
    .await?;
  info!(status = %order.status, "Payment proof recorded.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}
