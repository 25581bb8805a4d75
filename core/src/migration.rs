// storefront/src/migration.rs

//! One-time move of slug-keyed carts and orders to uid-keyed storage. Running it again
//! finds nothing left to move.

use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{event, instrument, Level};

use crate::cart::{cart_map_from_value, cart_map_to_value, CartMap};
use crate::error::ShopResult;
use crate::identity::Identity;
use crate::model::{OrderStatus, UserProfile};
use crate::store::tree::{children, first_str};
use crate::store::{paths, DocPath, SharedStore, WriteBatch};

fn display_handle(identity: &Identity) -> String {
  let base = identity
    .display_name
    .as_deref()
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .or(identity.email.as_deref())
    .unwrap_or_default()
    .trim();
  base.split('@').next().unwrap_or_default().to_string()
}

/// Key the old cart pages used: display name or email local part, with every character
/// outside `[A-Za-z0-9_-]` replaced by `_`.
pub fn cart_slug(identity: &Identity) -> String {
  display_handle(identity)
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
    .collect()
}

/// Key the old order pages used: the display name lowercased with every whitespace run
/// (leading and trailing ones included) replaced by `_`, else the email local part.
pub fn order_slug(identity: &Identity) -> String {
  match identity.display_name.as_deref().filter(|n| !n.is_empty()) {
    Some(name) => {
      let mut slug = String::with_capacity(name.len());
      let mut in_run = false;
      for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
          if !in_run {
            slug.push('_');
          }
          in_run = true;
        } else {
          slug.push(c);
          in_run = false;
        }
      }
      slug
    }
    None => identity
      .email
      .as_deref()
      .unwrap_or_default()
      .split('@')
      .next()
      .unwrap_or_default()
      .to_string(),
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
  pub uid: String,
  /// Cart lines taken from legacy locations.
  pub cart_lines_merged: usize,
  pub legacy_carts_removed: usize,
  pub orders_moved: usize,
  pub statuses_normalized: usize,
  /// Legacy orders left in place because the uid-keyed copy already exists.
  pub conflicts: Vec<String>,
  /// Orders whose status could not be mapped; moved unchanged.
  pub unrecognized_statuses: Vec<String>,
}

impl MigrationReport {
  pub fn is_noop(&self) -> bool {
    self.cart_lines_merged == 0
      && self.legacy_carts_removed == 0
      && self.orders_moved == 0
      && self.statuses_normalized == 0
  }
}

/// Legacy order found outside `TBL_ORDERS/<uid>`.
struct LegacyOrder {
  order_id: String,
  source: DocPath,
  record: Value,
}

fn owner_of(record: &Value) -> Option<&str> {
  first_str(record, &["userId", "uid"])
}

/// Rewrites `status` to its canonical spelling. `Some(true)` when it changed, `None`
/// when it is not a known status.
fn normalize_status(record: &mut Value) -> Option<bool> {
  let raw = record.get("status")?.as_str()?.to_string();
  let status = OrderStatus::from_str(&raw).ok()?;
  if status.as_str() == raw {
    return Some(false);
  }
  if let Some(map) = record.as_object_mut() {
    map.insert("status".to_string(), Value::from(status.as_str()));
  }
  Some(true)
}

#[derive(Clone)]
pub struct Migrator {
  store: SharedStore,
}

impl Migrator {
  pub fn new(store: SharedStore) -> Self {
    Migrator { store }
  }

  #[instrument(name = "Migrator::migrate_user", skip(self), fields(uid = %identity.uid))]
  pub async fn migrate_user(&self, identity: &Identity) -> ShopResult<MigrationReport> {
    let mut report = MigrationReport {
      uid: identity.uid.clone(),
      ..Default::default()
    };
    self.migrate_cart(identity, &mut report).await?;
    self.migrate_orders(identity, &mut report).await?;
    if report.is_noop() {
      event!(Level::DEBUG, "Nothing to migrate.");
    } else {
      event!(
        Level::INFO,
        cart_lines = report.cart_lines_merged,
        orders_moved = report.orders_moved,
        statuses_normalized = report.statuses_normalized,
        conflicts = report.conflicts.len(),
        "User migrated."
      );
    }
    Ok(report)
  }

  /// Walks every `users/<uid>` profile.
  #[instrument(name = "Migrator::migrate_all", skip(self))]
  pub async fn migrate_all(&self) -> ShopResult<Vec<MigrationReport>> {
    let users = self.store.get(&paths::users()).await?.unwrap_or(Value::Null);
    let mut reports = Vec::new();
    for (uid, record) in children(&users) {
      if !record.is_object() {
        continue;
      }
      let profile = UserProfile::from_record(record);
      let mut identity = Identity::new(uid);
      identity.display_name = profile.display_name;
      identity.email = profile.email;
      reports.push(self.migrate_user(&identity).await?);
    }
    event!(Level::INFO, users = reports.len(), "Migration pass finished.");
    Ok(reports)
  }

  async fn migrate_cart(&self, identity: &Identity, report: &mut MigrationReport) -> ShopResult<()> {
    let canonical_path = paths::cart(&identity.uid);
    let mut cart = cart_map_from_value(self.store.get(&canonical_path).await?.as_ref());
    let mut batch = WriteBatch::new();

    let slug = cart_slug(identity);
    if !slug.is_empty() && slug != identity.uid {
      let slug_path = paths::legacy_slug_cart(&slug);
      if let Some(raw) = self.store.get(&slug_path).await? {
        let legacy: CartMap = cart_map_from_value(Some(&raw));
        report.cart_lines_merged += legacy.len();
        cart.extend(legacy);
        batch.insert(slug_path, Value::Null);
        report.legacy_carts_removed += 1;
      }
    }

    let profile_path = paths::legacy_profile_cart(&identity.uid);
    if let Some(raw) = self.store.get(&profile_path).await? {
      for (product_id, qty) in cart_map_from_value(Some(&raw)) {
        if !cart.contains_key(&product_id) {
          cart.insert(product_id, qty);
          report.cart_lines_merged += 1;
        }
      }
      batch.insert(profile_path, Value::Null);
      report.legacy_carts_removed += 1;
    }

    if batch.is_empty() {
      return Ok(());
    }
    batch.insert(canonical_path, cart_map_to_value(&cart));
    self.store.commit(batch).await
  }

  async fn legacy_orders(&self, identity: &Identity) -> ShopResult<Vec<LegacyOrder>> {
    let all = self.store.get(&paths::all_orders()).await?.unwrap_or(Value::Null);
    let slug = order_slug(identity);
    let mut found = Vec::new();

    for (key, value) in children(&all) {
      if key == identity.uid {
        continue;
      }
      if owner_of(value).is_some() && value.get("status").is_some() {
        // Top-level order from the oldest checkout flow.
        if owner_of(value) == Some(identity.uid.as_str()) {
          found.push(LegacyOrder {
            order_id: first_str(value, &["orderId"]).unwrap_or(key.as_str()).to_string(),
            source: paths::all_orders().child(&key),
            record: value.clone(),
          });
        }
        continue;
      }
      // Slug folders are matched by the owner on each record, so orders filed under a
      // name the user has since changed are found too.
      for (order_id, record) in children(value) {
        if owner_of(record) == Some(identity.uid.as_str()) {
          if key != slug {
            event!(Level::DEBUG, folder = %key, current = %slug, order_id = %order_id, "Order found under a previous slug.");
          }
          found.push(LegacyOrder {
            source: paths::order(&key, &order_id),
            order_id,
            record: record.clone(),
          });
        }
      }
    }
    Ok(found)
  }

  async fn migrate_orders(&self, identity: &Identity, report: &mut MigrationReport) -> ShopResult<()> {
    let uid = identity.uid.as_str();
    let canonical = self.store.get(&paths::orders(uid)).await?.unwrap_or(Value::Null);
    let mut batch = WriteBatch::new();

    for (order_id, record) in children(&canonical) {
      let mut record = record.clone();
      match normalize_status(&mut record) {
        Some(true) => {
          batch.insert(paths::order(uid, &order_id).child("status"), record["status"].clone());
          report.statuses_normalized += 1;
        }
        Some(false) => {}
        None => report.unrecognized_statuses.push(order_id),
      }
    }

    for legacy in self.legacy_orders(identity).await? {
      if canonical.get(&legacy.order_id).is_some() {
        event!(Level::WARN, order_id = %legacy.order_id, source = %legacy.source, "Order already migrated; leaving legacy copy.");
        report.conflicts.push(legacy.order_id);
        continue;
      }
      let mut record = legacy.record;
      match normalize_status(&mut record) {
        Some(true) => report.statuses_normalized += 1,
        Some(false) => {}
        None => report.unrecognized_statuses.push(legacy.order_id.clone()),
      }
      if let Some(map) = record.as_object_mut() {
        map.insert("orderId".to_string(), Value::from(legacy.order_id.as_str()));
        map.insert("userId".to_string(), Value::from(uid));
        map.remove("uid");
      }
      batch.insert(paths::order(uid, &legacy.order_id), record);
      batch.insert(legacy.source, Value::Null);
      report.orders_moved += 1;
    }

    if batch.is_empty() {
      return Ok(());
    }
    self.store.commit(batch).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugs_follow_the_old_key_rules() {
    let named = Identity::new("u1").with_display_name("Ana Maria.Cruz");
    assert_eq!(cart_slug(&named), "Ana_Maria_Cruz");
    assert_eq!(order_slug(&named), "ana_maria.cruz");

    let spaced = Identity::new("u1").with_display_name("  Ana \t Cruz ");
    assert_eq!(order_slug(&spaced), "_ana_cruz_");

    let email_only = Identity::new("u2").with_email("jo.bo@example.com");
    assert_eq!(cart_slug(&email_only), "jo_bo");
    assert_eq!(order_slug(&email_only), "jo.bo");
  }

  #[test]
  fn status_normalization() {
    let mut record = serde_json::json!({ "status": "TO_SHIP" });
    assert_eq!(normalize_status(&mut record), Some(true));
    assert_eq!(record["status"], "processing");
    assert_eq!(normalize_status(&mut record), Some(false));
    let mut odd = serde_json::json!({ "status": "lost_in_mail" });
    assert_eq!(normalize_status(&mut odd), None);
  }
}
