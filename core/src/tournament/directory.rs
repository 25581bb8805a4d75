// storefront/src/tournament/directory.rs

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{event, Level};

use super::player::{PlayerInfo, PlayerRef};
use crate::error::ShopResult;
use crate::model::UserProfile;
use crate::store::{paths, SharedStore};

/// Memoized `users/<uid>` reads. Misses are cached as well; entries live as long as
/// the directory.
pub struct UserDirectory {
  store: SharedStore,
  cache: Mutex<HashMap<String, Option<UserProfile>>>,
}

impl UserDirectory {
  pub fn new(store: SharedStore) -> Self {
    UserDirectory {
      store,
      cache: Mutex::new(HashMap::new()),
    }
  }

  pub async fn lookup(&self, uid: &str) -> ShopResult<Option<UserProfile>> {
    if let Some(hit) = self.cache.lock().get(uid) {
      return Ok(hit.clone());
    }
    let profile = self
      .store
      .get(&paths::user(uid))
      .await?
      .filter(|record| record.is_object())
      .map(|record| UserProfile::from_record(&record));
    event!(Level::TRACE, uid, found = profile.is_some(), "User directory miss.");
    self.cache.lock().insert(uid.to_string(), profile.clone());
    Ok(profile)
  }

  pub async fn resolve(&self, player: Option<&PlayerRef>) -> ShopResult<PlayerInfo> {
    let Some(player) = player else {
      return Ok(PlayerInfo::unknown());
    };
    let profile = match player.lookup_id() {
      Some(uid) => self.lookup(uid).await?,
      None => None,
    };
    Ok(player.describe(profile.as_ref()))
  }

  pub fn cached_len(&self) -> usize {
    self.cache.lock().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{DocumentStore, MemoryStore};
  use serde_json::json;
  use std::sync::Arc;

  #[tokio::test]
  async fn lookups_are_memoized_including_misses() {
    let store = MemoryStore::with_document(json!({
      "users": { "uid-aaaa1111": { "displayName": "Ana", "avatar": "a.png" } }
    }));
    let directory = UserDirectory::new(Arc::new(store.clone()));

    let ana = directory.resolve(Some(&PlayerRef::Bare("uid-aaaa1111".into()))).await.unwrap();
    assert_eq!(ana.name, "Ana");
    assert_eq!(ana.avatar, "a.png");

    let ghost = directory.resolve(Some(&PlayerRef::Bare("uid-nobody00".into()))).await.unwrap();
    assert_eq!(ghost.name, "uid-nobody00");
    assert_eq!(directory.cached_len(), 2);

    store
      .set(&paths::user("uid-nobody00"), json!({ "displayName": "Late" }))
      .await
      .unwrap();
    let still_cached = directory.resolve(Some(&PlayerRef::Bare("uid-nobody00".into()))).await.unwrap();
    assert_eq!(still_cached.name, "uid-nobody00");
  }
}
