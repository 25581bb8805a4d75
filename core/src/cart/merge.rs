// storefront/src/cart/merge.rs

use super::CartMap;

/// Sum merge: every id from either side survives with `remote + local` units.
pub fn merge_carts(remote: &CartMap, local: &CartMap) -> CartMap {
  let mut merged = remote.clone();
  for (product_id, qty) in local {
    let entry = merged.entry(product_id.clone()).or_insert(0);
    *entry = entry.saturating_add(*qty);
  }
  merged
}
