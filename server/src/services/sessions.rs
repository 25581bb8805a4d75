// storefront_server/src/services/sessions.rs

//! Bearer-token sessions. Each session stands in for one signed-in device: it owns the
//! device cart (bound to the user's remote cart) and the checkout staging state.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use storefront::{
  CartBinding, CartMap, CartReconciler, CartSync, CheckoutSession, CheckoutSettings, Identity, LocalCart, SharedStore,
  ShopError, ShopResult,
};
use tracing::{info, instrument, warn};

pub struct DeviceSession {
  pub token: String,
  pub identity: Identity,
  pub is_admin: bool,
  pub checkout: CheckoutSession,
  cart: CartSync,
}

impl DeviceSession {
  /// The live cart binding. Fails once the session has been signed out.
  pub fn cart(&self) -> ShopResult<Arc<CartBinding>> {
    self
      .cart
      .binding()
      .ok_or_else(|| ShopError::Validation("Cart is not available for this session".to_string()))
  }
}

pub struct SessionRegistry {
  store: SharedStore,
  settings: CheckoutSettings,
  sessions: RwLock<HashMap<String, Arc<DeviceSession>>>,
}

impl SessionRegistry {
  pub fn new(store: SharedStore, settings: CheckoutSettings) -> Self {
    SessionRegistry {
      store,
      settings,
      sessions: RwLock::new(HashMap::new()),
    }
  }

  /// Opens a session for `identity`, merging the device's guest cart into the remote one.
  #[instrument(name = "SessionRegistry::open", skip(self, guest_cart), fields(uid = %identity.uid, guest_lines = guest_cart.len()))]
  pub async fn open(&self, identity: Identity, is_admin: bool, guest_cart: CartMap) -> ShopResult<Arc<DeviceSession>> {
    let cart = CartSync::new(CartReconciler::new(self.store.clone()), LocalCart::from_map(guest_cart));
    cart.apply(Some(identity.clone())).await?;

    let session = Arc::new(DeviceSession {
      token: uuid::Uuid::new_v4().to_string(),
      identity,
      is_admin,
      checkout: CheckoutSession::new(self.settings),
      cart,
    });
    self.sessions.write().insert(session.token.clone(), Arc::clone(&session));
    info!(sessions = self.len(), "Session opened.");
    Ok(session)
  }

  pub fn get(&self, token: &str) -> Option<Arc<DeviceSession>> {
    self.sessions.read().get(token).cloned()
  }

  /// Ends the session: unbinds its cart and drops its checkout state.
  #[instrument(name = "SessionRegistry::close", skip(self, token))]
  pub async fn close(&self, token: &str) -> bool {
    let removed = self.sessions.write().remove(token);
    let Some(session) = removed else {
      return false;
    };
    if let Err(err) = session.cart.apply(None).await {
      warn!(error = %err, uid = %session.identity.uid, "Cart unbind reported an error.");
    }
    session.checkout.clear_all();
    info!(uid = %session.identity.uid, "Session closed.");
    true
  }

  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use storefront::{paths, DocumentStore, MemoryStore};

  #[actix_rt::test]
  async fn open_merges_guest_cart_and_close_unbinds() {
    let store = MemoryStore::new();
    store.set(&paths::cart("u-0000001"), json!({ "P1": 1 })).await.unwrap();
    let registry = SessionRegistry::new(Arc::new(store.clone()), CheckoutSettings::default());

    let guest: CartMap = [("P1".to_string(), 2), ("P2".to_string(), 1)].into();
    let session = registry.open(Identity::new("u-0000001"), false, guest).await.unwrap();
    assert_eq!(session.cart().unwrap().badge_count(), 4);
    assert_eq!(store.listener_count(), 1);
    assert!(registry.get(&session.token).is_some());

    assert!(registry.close(&session.token).await);
    assert!(registry.get(&session.token).is_none());
    assert!(session.cart().is_err());
    assert_eq!(store.listener_count(), 0);
    assert!(!registry.close(&session.token).await);
  }
}
