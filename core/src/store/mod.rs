// storefront/src/store/mod.rs

//! The remote document store seam: a key-path JSON tree with realtime subscriptions,
//! atomic multi-path batches and single-path transactions.

pub mod memory;
pub mod path;
pub mod tree;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ShopResult;
pub use memory::MemoryStore;
pub use path::{paths, DocPath};

/// Tag attached to a write so a subscriber can recognise its own changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin(u64);

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

impl Origin {
  /// Writes nobody claims.
  pub const ANONYMOUS: Origin = Origin(0);

  /// A fresh, process-unique writer tag.
  pub fn next() -> Self {
    Origin(NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed))
  }

  pub fn is_anonymous(self) -> bool {
    self == Origin::ANONYMOUS
  }
}

/// A set of writes applied atomically. Writing `null` deletes the path.
#[derive(Debug, Clone)]
pub struct WriteBatch {
  origin: Origin,
  entries: Vec<(DocPath, Value)>,
}

impl Default for WriteBatch {
  fn default() -> Self {
    Self::new()
  }
}

impl WriteBatch {
  pub fn new() -> Self {
    WriteBatch {
      origin: Origin::ANONYMOUS,
      entries: Vec::new(),
    }
  }

  pub fn with_origin(mut self, origin: Origin) -> Self {
    self.origin = origin;
    self
  }

  pub fn set(mut self, path: DocPath, value: Value) -> Self {
    self.entries.push((path, value));
    self
  }

  pub fn delete(self, path: DocPath) -> Self {
    self.set(path, Value::Null)
  }

  /// In-place variant of [`WriteBatch::set`] for batches built in loops.
  pub fn insert(&mut self, path: DocPath, value: Value) {
    self.entries.push((path, value));
  }

  pub fn origin(&self) -> Origin {
    self.origin
  }

  pub fn entries(&self) -> &[(DocPath, Value)] {
    &self.entries
  }

  pub fn into_entries(self) -> Vec<(DocPath, Value)> {
    self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

/// Delivered to listeners: the value now stored at the subscribed path and who wrote it.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
  pub path: DocPath,
  pub value: Option<Value>,
  pub origin: Origin,
}

pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync + 'static>;

/// Atomic read-modify-write body. Receives the current value (if any) and returns the
/// value to store (`None` deletes). Returning an error aborts without writing.
pub type TransactionFn = Box<dyn FnOnce(Option<Value>) -> ShopResult<Option<Value>> + Send + 'static>;

/// Handle for a live subscription. Dropping it (or calling [`Subscription::cancel`])
/// stops delivery.
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce() + Send + Sync + 'static>>,
}

impl Subscription {
  pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
    Subscription {
      cancel: Some(Box::new(cancel)),
    }
  }

  pub fn cancel(mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
  }
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
  /// Current value at `path`; `None` when nothing is stored there.
  async fn get(&self, path: &DocPath) -> ShopResult<Option<Value>>;

  /// Applies every entry of the batch or none of them.
  async fn commit(&self, batch: WriteBatch) -> ShopResult<()>;

  /// Atomic compare-and-write at a single path. Returns the value committed.
  async fn transaction(&self, path: &DocPath, origin: Origin, update: TransactionFn) -> ShopResult<Option<Value>>;

  /// A new key that sorts after every key previously generated by this store.
  fn generate_key(&self) -> String;

  /// Registers `listener` for changes at or below (or above) `path`. The listener is
  /// called once immediately with the current value.
  fn subscribe(&self, path: &DocPath, listener: ChangeListener) -> Subscription;

  async fn set(&self, path: &DocPath, value: Value) -> ShopResult<()> {
    self.commit(WriteBatch::new().set(path.clone(), value)).await
  }

  async fn remove(&self, path: &DocPath) -> ShopResult<()> {
    self.commit(WriteBatch::new().delete(path.clone())).await
  }

  /// Appends `value` under a freshly generated key and returns the key.
  async fn push(&self, path: &DocPath, value: Value) -> ShopResult<String> {
    let key = self.generate_key();
    self.set(&path.child(&key), value).await?;
    Ok(key)
  }
}

pub type SharedStore = Arc<dyn DocumentStore>;
