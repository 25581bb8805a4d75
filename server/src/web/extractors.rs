// storefront_server/src/web/extractors.rs

use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use std::sync::Arc;
use tracing::warn;

use crate::errors::AppError;
use crate::services::sessions::DeviceSession;
use crate::state::AppState;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
  req
    .headers()
    .get(actix_web::http::header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

fn session_from(req: &HttpRequest) -> Result<Arc<DeviceSession>, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
  let token = bearer_token(req).ok_or_else(|| {
    warn!("Missing bearer token.");
    AppError::Auth("Please sign in to continue".to_string())
  })?;
  state.sessions.get(token).ok_or_else(|| {
    warn!("Unknown or expired session token.");
    AppError::Auth("Your session has expired. Please sign in again.".to_string())
  })
}

/// The caller's session, resolved from `Authorization: Bearer <token>`.
pub struct AuthenticatedSession(pub Arc<DeviceSession>);

impl FromRequest for AuthenticatedSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(session_from(req).map(AuthenticatedSession))
  }
}

/// A session whose email is listed in `ADMIN_EMAILS`.
pub struct AdminSession(pub Arc<DeviceSession>);

impl FromRequest for AdminSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(session_from(req).and_then(|session| {
      if session.is_admin {
        Ok(AdminSession(session))
      } else {
        warn!(uid = %session.identity.uid, "Non-admin attempted an admin route.");
        Err(AppError::Forbidden("Admin access required".to_string()))
      }
    }))
  }
}
