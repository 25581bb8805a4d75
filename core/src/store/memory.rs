// storefront/src/store/memory.rs

//! In-process [`DocumentStore`]: one JSON tree behind a `parking_lot::RwLock`.
//! Writes are serialized under the lock; listeners run after it is released.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{event, instrument, Level};

use super::tree::{get_at, set_at};
use super::{ChangeEvent, ChangeListener, DocPath, DocumentStore, Origin, Subscription, TransactionFn, WriteBatch};
use crate::error::{ShopError, ShopResult};

struct ListenerEntry {
  id: u64,
  path: DocPath,
  listener: ChangeListener,
}

struct Inner {
  tree: RwLock<Value>,
  listeners: Mutex<Vec<ListenerEntry>>,
  denied: RwLock<Vec<DocPath>>,
  next_listener_id: AtomicU64,
  key_seq: AtomicU64,
}

#[derive(Clone)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for MemoryStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryStore")
      .field("listeners", &self.inner.listeners.lock().len())
      .finish()
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::with_document(Value::Object(Map::new()))
  }

  /// A store whose tree starts as `document` (e.g. a JSON export of the hosted database).
  pub fn with_document(document: Value) -> Self {
    MemoryStore {
      inner: Arc::new(Inner {
        tree: RwLock::new(super::tree::normalize(document)),
        listeners: Mutex::new(Vec::new()),
        denied: RwLock::new(Vec::new()),
        next_listener_id: AtomicU64::new(1),
        key_seq: AtomicU64::new(0),
      }),
    }
  }

  /// A copy of the whole tree.
  pub fn snapshot(&self) -> Value {
    self.inner.tree.read().clone()
  }

  /// Rejects every later write at or below `prefix` with `PermissionDenied`,
  /// the way security rules reject a client write.
  pub fn deny_writes(&self, prefix: DocPath) {
    self.inner.denied.write().push(prefix);
  }

  pub fn listener_count(&self) -> usize {
    self.inner.listeners.lock().len()
  }

  fn check_writable(&self, path: &DocPath) -> ShopResult<()> {
    let denied = self.inner.denied.read();
    match denied.iter().find(|prefix| prefix.is_ancestor_of(path)) {
      Some(_) => Err(ShopError::PermissionDenied { path: path.to_string() }),
      None => Ok(()),
    }
  }

  /// Delivers change events to every listener whose path overlaps one of `written`.
  fn notify(&self, written: &[DocPath], origin: Origin) {
    let targets: Vec<(DocPath, ChangeListener)> = {
      let listeners = self.inner.listeners.lock();
      listeners
        .iter()
        .filter(|entry| written.iter().any(|path| path.overlaps(&entry.path)))
        .map(|entry| (entry.path.clone(), Arc::clone(&entry.listener)))
        .collect()
    };
    if targets.is_empty() {
      return;
    }

    event!(Level::TRACE, listeners = targets.len(), ?origin, "Delivering change events.");
    for (path, listener) in targets {
      let value = get_at(&self.inner.tree.read(), path.segments()).cloned();
      listener(&ChangeEvent { path, value, origin });
    }
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  async fn get(&self, path: &DocPath) -> ShopResult<Option<Value>> {
    Ok(get_at(&self.inner.tree.read(), path.segments()).cloned())
  }

  #[instrument(name = "MemoryStore::commit", skip_all, fields(entries = batch.len(), origin = ?batch.origin()))]
  async fn commit(&self, batch: WriteBatch) -> ShopResult<()> {
    if batch.is_empty() {
      return Ok(());
    }
    for (path, _) in batch.entries() {
      self.check_writable(path)?;
    }

    let origin = batch.origin();
    let mut written = Vec::with_capacity(batch.len());
    {
      let mut tree = self.inner.tree.write();
      for (path, value) in batch.into_entries() {
        set_at(&mut tree, path.segments(), value);
        written.push(path);
      }
      if tree.is_null() {
        *tree = Value::Object(Map::new());
      }
    }
    event!(Level::DEBUG, "Batch committed.");

    self.notify(&written, origin);
    Ok(())
  }

  #[instrument(name = "MemoryStore::transaction", skip(self, update), fields(path = %path))]
  async fn transaction(&self, path: &DocPath, origin: Origin, update: TransactionFn) -> ShopResult<Option<Value>> {
    self.check_writable(path)?;

    let committed = {
      let mut tree = self.inner.tree.write();
      let current = get_at(&tree, path.segments()).cloned();
      let next = update(current)?;
      set_at(&mut tree, path.segments(), next.unwrap_or(Value::Null));
      if tree.is_null() {
        *tree = Value::Object(Map::new());
      }
      get_at(&tree, path.segments()).cloned()
    };
    event!(Level::DEBUG, "Transaction committed.");

    self.notify(std::slice::from_ref(path), origin);
    Ok(committed)
  }

  fn generate_key(&self) -> String {
    let seq = self.inner.key_seq.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!("{:013}{:06}", Utc::now().timestamp_millis().max(0), seq)
  }

  fn subscribe(&self, path: &DocPath, listener: ChangeListener) -> Subscription {
    let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
    self.inner.listeners.lock().push(ListenerEntry {
      id,
      path: path.clone(),
      listener: Arc::clone(&listener),
    });
    event!(Level::DEBUG, listener_id = id, path = %path, "Listener registered.");

    let value = get_at(&self.inner.tree.read(), path.segments()).cloned();
    listener(&ChangeEvent {
      path: path.clone(),
      value,
      origin: Origin::ANONYMOUS,
    });

    let weak: Weak<Inner> = Arc::downgrade(&self.inner);
    Subscription::new(move || {
      if let Some(inner) = weak.upgrade() {
        inner.listeners.lock().retain(|entry| entry.id != id);
        event!(Level::DEBUG, listener_id = id, "Listener removed.");
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn batch_writes_and_deletes_prune_empty_parents() {
    let store = MemoryStore::new();
    store
      .commit(
        WriteBatch::new()
          .set(DocPath::parse("TBL_CART/u1/P1"), json!(2))
          .set(DocPath::parse("TBL_CART/u1/P2"), json!(1)),
      )
      .await
      .unwrap();
    assert_eq!(
      store.get(&DocPath::parse("TBL_CART/u1")).await.unwrap(),
      Some(json!({"P1": 2, "P2": 1}))
    );

    store
      .commit(
        WriteBatch::new()
          .delete(DocPath::parse("TBL_CART/u1/P1"))
          .delete(DocPath::parse("TBL_CART/u1/P2")),
      )
      .await
      .unwrap();
    assert_eq!(store.get(&DocPath::parse("TBL_CART/u1")).await.unwrap(), None);
    assert_eq!(store.get(&DocPath::parse("TBL_CART")).await.unwrap(), None);
  }

  #[tokio::test]
  async fn denied_prefix_rejects_whole_batch() {
    let store = MemoryStore::new();
    store.deny_writes(DocPath::parse("TBL_PRODUCTS"));
    let result = store
      .commit(
        WriteBatch::new()
          .set(DocPath::parse("TBL_CART/u1/P1"), json!(1))
          .set(DocPath::parse("TBL_PRODUCTS/P1/stock"), json!(0)),
      )
      .await;
    assert!(matches!(result, Err(ShopError::PermissionDenied { .. })));
    assert_eq!(store.get(&DocPath::parse("TBL_CART/u1")).await.unwrap(), None);
  }

  #[tokio::test]
  async fn transaction_error_leaves_value_untouched() {
    let store = MemoryStore::with_document(json!({"counter": 3}));
    let result = store
      .transaction(
        &DocPath::parse("counter"),
        Origin::ANONYMOUS,
        Box::new(|_| Err(ShopError::Validation("nope".into()))),
      )
      .await;
    assert!(result.is_err());
    assert_eq!(store.get(&DocPath::parse("counter")).await.unwrap(), Some(json!(3)));
  }

  #[tokio::test]
  async fn listeners_receive_origin_and_stop_after_drop() {
    let store = MemoryStore::new();
    let seen: Arc<Mutex<Vec<(Option<Value>, Origin)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = store.subscribe(
      &DocPath::parse("TBL_CART/u1"),
      Arc::new(move |ev: &ChangeEvent| sink.lock().push((ev.value.clone(), ev.origin))),
    );

    let origin = Origin::next();
    store
      .commit(WriteBatch::new().with_origin(origin).set(DocPath::parse("TBL_CART/u1/P1"), json!(1)))
      .await
      .unwrap();
    store.set(&DocPath::parse("TBL_CART/u2/P1"), json!(5)).await.unwrap();
    drop(sub);
    store.set(&DocPath::parse("TBL_CART/u1/P1"), json!(9)).await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (None, Origin::ANONYMOUS));
    assert_eq!(seen[1], (Some(json!({"P1": 1})), origin));
    assert_eq!(store.listener_count(), 0);
  }

  #[test]
  fn generated_keys_sort_in_creation_order() {
    let store = MemoryStore::new();
    let keys: Vec<String> = (0..50).map(|_| store.generate_key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
  }
}
