// storefront/src/cart/reconciler.rs

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{event, instrument, Level};

use super::{cart_map_from_value, cart_map_to_value, merge_carts, CartMap, LocalCart};
use crate::catalog::{CartLine, CatalogReader};
use crate::error::{ShopError, ShopResult};
use crate::identity::Identity;
use crate::store::tree::as_i64_lenient;
use crate::store::{paths, ChangeEvent, DocPath, Origin, SharedStore, Subscription, WriteBatch};

#[derive(Clone)]
pub struct CartReconciler {
  store: SharedStore,
}

impl CartReconciler {
  pub fn new(store: SharedStore) -> Self {
    CartReconciler { store }
  }

  /// Merges `local` into the user's remote cart, makes the result authoritative and
  /// starts following remote changes.
  #[instrument(name = "CartReconciler::bind", skip(self, local), fields(uid = %identity.uid))]
  pub async fn bind(&self, identity: &Identity, local: LocalCart) -> ShopResult<CartBinding> {
    let path = paths::cart(&identity.uid);
    let origin = Origin::next();

    let remote = cart_map_from_value(self.store.get(&path).await?.as_ref());
    let merged = merge_carts(&remote, &local.snapshot());
    self
      .store
      .commit(WriteBatch::new().with_origin(origin).set(path.clone(), cart_map_to_value(&merged)))
      .await?;
    event!(
      Level::INFO,
      remote_lines = remote.len(),
      merged_lines = merged.len(),
      "Cart merged into remote."
    );
    local.replace(merged);

    let listener_local = local.clone();
    let subscription = self.store.subscribe(
      &path,
      Arc::new(move |change: &ChangeEvent| {
        if change.origin == origin {
          return;
        }
        listener_local.replace(cart_map_from_value(change.value.as_ref()));
      }),
    );

    Ok(CartBinding {
      uid: identity.uid.clone(),
      path,
      store: Arc::clone(&self.store),
      local,
      origin,
      subscription: Mutex::new(Some(subscription)),
      active: AtomicBool::new(true),
    })
  }
}

/// A signed-in user's cart on this device. Owns the realtime subscription on
/// `TBL_CART/<uid>`; dropping the binding ends it.
pub struct CartBinding {
  uid: String,
  path: DocPath,
  store: SharedStore,
  local: LocalCart,
  origin: Origin,
  subscription: Mutex<Option<Subscription>>,
  active: AtomicBool,
}

impl std::fmt::Debug for CartBinding {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartBinding")
      .field("uid", &self.uid)
      .field("origin", &self.origin)
      .field("active", &self.is_active())
      .finish()
  }
}

impl CartBinding {
  pub fn uid(&self) -> &str {
    &self.uid
  }

  pub fn origin(&self) -> Origin {
    self.origin
  }

  pub fn is_active(&self) -> bool {
    self.active.load(Ordering::Acquire)
  }

  pub fn local(&self) -> &LocalCart {
    &self.local
  }

  pub fn snapshot(&self) -> CartMap {
    self.local.snapshot()
  }

  pub fn badge_count(&self) -> u32 {
    self.local.badge()
  }

  fn ensure_active(&self) -> ShopResult<()> {
    if self.is_active() {
      Ok(())
    } else {
      Err(ShopError::Validation("Cart session has ended".to_string()))
    }
  }

  /// Adds `quantity` units on top of what the remote cart already holds.
  #[instrument(name = "CartBinding::add", skip(self), fields(uid = %self.uid))]
  pub async fn add(&self, product_id: &str, quantity: u32) -> ShopResult<CartMap> {
    self.ensure_active()?;
    let line = self.path.key_child(product_id)?;
    if quantity == 0 {
      return Err(ShopError::Validation("Quantity must be at least 1".to_string()));
    }
    self
      .store
      .transaction(
        &line,
        self.origin,
        Box::new(move |current: Option<Value>| {
          let existing = as_i64_lenient(current.as_ref()).unwrap_or(0).max(0);
          Ok(Some(json!(existing + i64::from(quantity))))
        }),
      )
      .await?;
    self.refresh().await
  }

  /// Overwrites the quantity; values below one are raised to one.
  #[instrument(name = "CartBinding::set_quantity", skip(self), fields(uid = %self.uid))]
  pub async fn set_quantity(&self, product_id: &str, quantity: u32) -> ShopResult<CartMap> {
    self.ensure_active()?;
    let line = self.path.key_child(product_id)?;
    let quantity = quantity.max(1);
    self
      .store
      .commit(WriteBatch::new().with_origin(self.origin).set(line, json!(quantity)))
      .await?;
    self.refresh().await
  }

  #[instrument(name = "CartBinding::remove", skip(self), fields(uid = %self.uid))]
  pub async fn remove(&self, product_id: &str) -> ShopResult<CartMap> {
    self.ensure_active()?;
    let line = self.path.key_child(product_id)?;
    self
      .store
      .commit(WriteBatch::new().with_origin(self.origin).delete(line))
      .await?;
    self.refresh().await
  }

  #[instrument(name = "CartBinding::clear", skip(self), fields(uid = %self.uid))]
  pub async fn clear(&self) -> ShopResult<CartMap> {
    self.ensure_active()?;
    self
      .store
      .commit(WriteBatch::new().with_origin(self.origin).delete(self.path.clone()))
      .await?;
    self.refresh().await
  }

  /// Removes the purchased lines in one atomic batch.
  #[instrument(name = "CartBinding::clear_selected", skip(self, product_ids), fields(uid = %self.uid, count = product_ids.len()))]
  pub async fn clear_selected(&self, product_ids: &[String]) -> ShopResult<CartMap> {
    self.ensure_active()?;
    let mut batch = WriteBatch::new().with_origin(self.origin);
    for product_id in product_ids {
      batch.insert(self.path.key_child(product_id)?, Value::Null);
    }
    self.store.commit(batch).await?;
    self.refresh().await
  }

  /// Re-reads the remote cart into the local cache.
  pub async fn refresh(&self) -> ShopResult<CartMap> {
    let cart = cart_map_from_value(self.store.get(&self.path).await?.as_ref());
    self.local.replace(cart.clone());
    Ok(cart)
  }

  pub async fn lines(&self, catalog: &CatalogReader) -> ShopResult<Vec<CartLine>> {
    catalog.join_cart(&self.snapshot()).await
  }

  /// Stops following the remote cart and empties the device cache.
  pub fn unbind(&self) {
    if !self.active.swap(false, Ordering::AcqRel) {
      return;
    }
    if let Some(subscription) = self.subscription.lock().take() {
      subscription.cancel();
    }
    self.local.clear();
    event!(Level::INFO, uid = %self.uid, "Cart unbound.");
  }
}

/// Keeps at most one [`CartBinding`] in step with the signed-in identity.
pub struct CartSync {
  reconciler: CartReconciler,
  local: LocalCart,
  current: Mutex<Option<Arc<CartBinding>>>,
}

impl CartSync {
  pub fn new(reconciler: CartReconciler, local: LocalCart) -> Self {
    CartSync {
      reconciler,
      local,
      current: Mutex::new(None),
    }
  }

  pub fn local(&self) -> &LocalCart {
    &self.local
  }

  pub fn binding(&self) -> Option<Arc<CartBinding>> {
    self.current.lock().clone()
  }

  /// Tears down the previous binding, then binds `identity` if there is one.
  #[instrument(name = "CartSync::apply", skip_all, fields(uid = ?identity.as_ref().map(|i| i.uid.as_str())))]
  pub async fn apply(&self, identity: Option<Identity>) -> ShopResult<Option<Arc<CartBinding>>> {
    let previous = self.current.lock().take();
    if let Some(previous) = previous {
      if identity.as_ref().map(|i| i.uid.as_str()) == Some(previous.uid()) && previous.is_active() {
        *self.current.lock() = Some(Arc::clone(&previous));
        return Ok(Some(previous));
      }
      previous.unbind();
    }

    let Some(identity) = identity else {
      self.local.clear();
      return Ok(None);
    };

    let binding = Arc::new(self.reconciler.bind(&identity, self.local.clone()).await?);
    *self.current.lock() = Some(Arc::clone(&binding));
    Ok(Some(binding))
  }

  /// Applies every identity change published on `identities` until the sender goes away.
  pub async fn follow(&self, mut identities: watch::Receiver<Option<Identity>>) {
    let initial = identities.borrow_and_update().clone();
    if let Err(err) = self.apply(initial).await {
      event!(Level::WARN, error = %err, "Cart binding failed.");
    }
    while identities.changed().await.is_ok() {
      let identity = identities.borrow_and_update().clone();
      if let Err(err) = self.apply(identity).await {
        event!(Level::WARN, error = %err, "Cart binding failed.");
      }
    }
    event!(Level::DEBUG, "Identity source closed; cart sync stopping.");
  }
}
