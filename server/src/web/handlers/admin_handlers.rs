// storefront_server/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront::{Order, OrderQuery, OrderStatus};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminSession;

#[derive(Deserialize, Debug, Default)]
pub struct OrdersQuery {
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub q: Option<String>,
  #[serde(default)]
  pub owner: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct VerifyPayload {
  pub approved: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
  pub status: String,
  #[serde(default)]
  pub note: Option<String>,
  #[serde(default)]
  pub tracking_number: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct NotePayload {
  pub note: String,
}

#[instrument(name = "handler::admin_orders", skip(app_state, _admin))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<OrdersQuery>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    Some(raw) => Some(raw.parse::<OrderStatus>()?),
    None => None,
  };
  let records = app_state
    .orders
    .search(query.owner.as_deref(), &OrderQuery { status, text: query.q })
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": records })))
}

#[instrument(name = "handler::admin_order_stats", skip_all)]
pub async fn stats_handler(app_state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse, AppError> {
  let stats = app_state.orders.statistics().await?;
  Ok(HttpResponse::Ok().json(stats))
}

#[instrument(name = "handler::admin_verify_payment", skip(app_state, path, admin), fields(admin = %admin.0.identity.uid))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(String, String)>,
  req_payload: web::Json<VerifyPayload>,
  admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let (owner, order_id) = path.into_inner();
  let admin_id = admin.0.identity.uid.as_str();
  let order = if req_payload.approved {
    app_state.orders.approve_payment(&owner, &order_id, admin_id).await?
  } else {
    app_state.orders.reject_payment(&owner, &order_id, admin_id).await?
  };
  info!(order_id = %order_id, status = %order.status, "Payment reviewed.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::admin_update_status", skip(app_state, path, admin), fields(admin = %admin.0.identity.uid))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(String, String)>,
  req_payload: web::Json<StatusPayload>,
  admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let (owner, order_id) = path.into_inner();
  let payload = req_payload.into_inner();
  let status: OrderStatus = payload.status.parse()?;
  let note = payload.note.as_deref();
  let orders = &app_state.orders;

  let order: Order = match status {
    OrderStatus::ReadyForPickup => {
      orders
        .mark_ready_for_pickup(&owner, &order_id, &admin.0.identity.uid)
        .await?
    }
    OrderStatus::Shipped => {
      orders
        .mark_shipped(&owner, &order_id, payload.tracking_number.as_deref())
        .await?
    }
    // Payment outcomes also stamp the payment block, so they take the verification path.
    OrderStatus::PaymentVerified => {
      orders
        .verify_payment(&owner, &order_id, &admin.0.identity.uid, true)
        .await?
    }
    OrderStatus::PaymentRejected => {
      orders
        .verify_payment(&owner, &order_id, &admin.0.identity.uid, false)
        .await?
    }
    OrderStatus::PaymentSubmitted => {
      return Err(AppError::Validation(
        "Payment proof is submitted by the customer, not set by an admin".to_string(),
      ))
    }
    OrderStatus::Delivered => orders.mark_delivered(&owner, &order_id).await?,
    OrderStatus::Completed => orders.mark_completed(&owner, &order_id).await?,
    OrderStatus::Cancelled => orders.cancel(&owner, &order_id, note).await?,
    OrderStatus::Refunded => orders.refund(&owner, &order_id, note).await?,
    other => {
      let default_note = format!("Status updated to {}", other.display_name());
      orders
        .update_order_status(&owner, &order_id, other, note.unwrap_or(&default_note))
        .await?
    }
  };
  info!(order_id = %order_id, status = %order.status, "Order status updated.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::admin_add_note", skip(app_state, path, req_payload, _admin))]
pub async fn add_note_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(String, String)>,
  req_payload: web::Json<NotePayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let (owner, order_id) = path.into_inner();
  let order = app_state.orders.add_admin_note(&owner, &order_id, &req_payload.note).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::admin_migrate", skip_all)]
pub async fn migrate_handler(app_state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse, AppError> {
  let reports = app_state.migrator.migrate_all().await?;
  let changed = reports.iter().filter(|r| !r.is_noop()).count();
  info!(users = reports.len(), changed, "Migration run from admin route.");
  Ok(HttpResponse::Ok().json(json!({ "reports": reports, "changed": changed })))
}
