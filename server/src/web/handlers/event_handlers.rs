// storefront_server/src/web/handlers/event_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_events", skip(app_state))]
pub async fn list_events_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let resolver = app_state.event_resolver();
  let listing = resolver.listing().await?;
  info!(
    looked_up = resolver.directory().cached_len(),
    "Event listing resolved."
  );
  Ok(HttpResponse::Ok().json(listing))
}

/// Event details, round panels and the podium once the event is completed.
#[instrument(name = "handler::get_event", skip(app_state, path), fields(event_id = %path.as_ref()))]
pub async fn get_event_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let event_id = path.into_inner();
  match app_state.event_resolver().results(&event_id).await? {
    Some(results) => Ok(HttpResponse::Ok().json(results)),
    None => Err(AppError::NotFound(format!("Event {} not found.", event_id))),
  }
}
