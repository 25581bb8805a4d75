// storefront_server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront::{CartBinding, Money};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedSession;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequestPayload {
  pub product_id: String,
  #[serde(default = "one")]
  pub quantity: u32,
}

fn one() -> u32 {
  1
}

#[derive(Deserialize, Debug)]
pub struct SetQuantityPayload {
  pub quantity: u32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StageSelectionPayload {
  pub selected_ids: Vec<String>,
}

/// The cart joined against the catalog, the way the cart page shows it.
async fn cart_view(app_state: &AppState, binding: &CartBinding) -> Result<HttpResponse, AppError> {
  let lines = binding.lines(&app_state.catalog).await?;
  let total: Money = lines.iter().map(|l| l.line_total()).sum();
  Ok(HttpResponse::Ok().json(json!({
    "items": lines,
    "count": binding.badge_count(),
    "total": total,
    "totalLabel": total.display(),
  })))
}

// --- Handler Implementations ---

#[instrument(name = "handler::get_cart", skip_all, fields(uid = %auth.0.identity.uid))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let binding = auth.0.cart()?;
  cart_view(&app_state, &binding).await
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth),
  fields(uid = %auth.0.identity.uid, product_id = %req_payload.product_id, quantity = req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  if app_state.catalog.get(&req_payload.product_id).await?.is_none() {
    return Err(AppError::NotFound(format!("Product with ID {} not found.", req_payload.product_id)));
  }
  let binding = auth.0.cart()?;
  binding.add(&req_payload.product_id, req_payload.quantity).await?;
  info!(count = binding.badge_count(), "Item added to cart.");
  cart_view(&app_state, &binding).await
}

#[instrument(name = "handler::set_cart_quantity", skip(app_state, path, req_payload, auth), fields(uid = %auth.0.identity.uid, product_id = %path.as_ref()))]
pub async fn set_quantity_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_payload: web::Json<SetQuantityPayload>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let binding = auth.0.cart()?;
  binding.set_quantity(&path.into_inner(), req_payload.quantity).await?;
  cart_view(&app_state, &binding).await
}

#[instrument(name = "handler::remove_from_cart", skip(app_state, path, auth), fields(uid = %auth.0.identity.uid, product_id = %path.as_ref()))]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let binding = auth.0.cart()?;
  binding.remove(&path.into_inner()).await?;
  cart_view(&app_state, &binding).await
}

/// Stages the chosen lines for checkout.
#[instrument(name = "handler::stage_checkout", skip_all, fields(uid = %auth.0.identity.uid, selected = req_payload.selected_ids.len()))]
pub async fn stage_checkout_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<StageSelectionPayload>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let session = auth.0;
  let lines = session.cart()?.lines(&app_state.catalog).await?;
  let selection = session.checkout.stage_selection(&lines, &req_payload.selected_ids)?;
  Ok(HttpResponse::Ok().json(json!({ "selection": selection })))
}
