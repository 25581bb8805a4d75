// storefront_server/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;
use storefront::{MemoryStore, Migrator, SharedStore};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);

  if std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
    builder.json().init();
  } else {
    builder.init();
  }
}

/// Builds the in-memory document tree, seeded from `SEED_FILE` when one is configured.
async fn load_store(config: &AppConfig) -> anyhow::Result<MemoryStore> {
  let Some(path) = config.seed_file.as_deref() else {
    tracing::info!("No SEED_FILE configured; starting with an empty store.");
    return Ok(MemoryStore::new());
  };
  let raw = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("reading seed file {}", path))?;
  let document: Value = serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path))?;
  tracing::info!(seed_file = %path, "Loaded seed document.");
  Ok(MemoryStore::with_document(document))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  init_tracing();
  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let store: SharedStore = match load_store(&app_config).await {
    Ok(store) => Arc::new(store),
    Err(e) => {
      tracing::error!(error = %format!("{:#}", e), "Failed to load the seed document.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{:#}", e)));
    }
  };

  if app_config.run_migration {
    match Migrator::new(store.clone()).migrate_all().await {
      Ok(reports) => {
        let changed = reports.iter().filter(|r| !r.is_noop()).count();
        tracing::info!(users = reports.len(), changed, "Startup migration finished.");
      }
      Err(e) => tracing::error!(error = %e, "Startup migration failed; serving unmigrated data."),
    }
  }

  let app_state = AppState::new(store, app_config.clone());

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!(base_url = %app_config.app_base_url, "Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
