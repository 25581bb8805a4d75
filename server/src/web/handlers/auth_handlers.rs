// storefront_server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront::{CartMap, IdentityProvider};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::sessions::DeviceSession;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedSession;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub display_name: Option<String>,
  /// Guest cart held by the device before signing in.
  #[serde(default)]
  pub cart: CartMap,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub cart: CartMap,
}

fn session_body(session: &DeviceSession) -> serde_json::Value {
  json!({
    "token": session.token,
    "user": session.identity,
    "isAdmin": session.is_admin,
    "cartCount": session.cart().map(|c| c.badge_count()).unwrap_or(0),
  })
}

// --- Handler Implementations ---

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let identity = app_state
    .identity
    .sign_up(&payload.email, &payload.password, payload.display_name.as_deref())
    .await?;
  let is_admin = app_state.config.is_admin_email(identity.email.as_deref());
  let session = app_state.sessions.open(identity, is_admin, payload.cart).await?;

  info!(uid = %session.identity.uid, "Signup successful.");
  Ok(HttpResponse::Created().json(session_body(&session)))
}

#[instrument(name = "handler::signin", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let identity = app_state.identity.sign_in(&payload.email, &payload.password).await?;
  let is_admin = app_state.config.is_admin_email(identity.email.as_deref());
  let session = app_state.sessions.open(identity, is_admin, payload.cart).await?;

  info!(uid = %session.identity.uid, "Signin successful.");
  Ok(HttpResponse::Ok().json(session_body(&session)))
}

#[instrument(name = "handler::signout", skip_all, fields(uid = %auth.0.identity.uid))]
pub async fn signout_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  app_state.sessions.close(&auth.0.token).await;
  Ok(HttpResponse::NoContent().finish())
}

pub async fn me_handler(auth: AuthenticatedSession) -> Result<HttpResponse, AppError> {
  let session = auth.0;
  Ok(HttpResponse::Ok().json(json!({
    "user": session.identity,
    "userName": session.identity.user_name(),
    "isAdmin": session.is_admin,
    "cartCount": session.cart().map(|c| c.badge_count()).unwrap_or(0),
  })))
}
