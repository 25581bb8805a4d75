// storefront_server/src/state.rs
use crate::config::AppConfig;
use crate::services::auth_service::MemoryIdentityProvider;
use crate::services::sessions::SessionRegistry;
use std::sync::Arc;
use storefront::{CatalogReader, EventResolver, Migrator, OrderManager, OrderPlacement, SharedStore};

#[derive(Clone)]
pub struct AppState {
  pub store: SharedStore,
  pub config: Arc<AppConfig>, // Share loaded config
  pub identity: Arc<MemoryIdentityProvider>,
  pub sessions: Arc<SessionRegistry>,
  pub catalog: CatalogReader,
  pub orders: OrderManager,
  pub placement: Arc<OrderPlacement>,
  pub migrator: Migrator,
}

impl AppState {
  pub fn new(store: SharedStore, config: Arc<AppConfig>) -> Self {
    let orders = OrderManager::new(store.clone()).with_settings(config.checkout);
    AppState {
      identity: Arc::new(MemoryIdentityProvider::new(store.clone(), config.min_password_length)),
      sessions: Arc::new(SessionRegistry::new(store.clone(), config.checkout)),
      catalog: CatalogReader::new(store.clone()),
      placement: Arc::new(OrderPlacement::new(orders.clone())),
      migrator: Migrator::new(store.clone()),
      orders,
      store,
      config,
    }
  }

  /// Player lookups are cached per resolver, so each request gets a fresh one.
  pub fn event_resolver(&self) -> EventResolver {
    EventResolver::new(self.store.clone())
  }
}
