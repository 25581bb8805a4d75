// storefront/src/catalog.rs

//! Read-only projection of `TBL_PRODUCTS` into display-ready items, and the join of a
//! cart map against it.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};

use crate::cart::CartMap;
use crate::error::ShopResult;
use crate::model::{LineItem, Product};
use crate::money::Money;
use crate::store::path::is_key;
use crate::store::tree::children;
use crate::store::{paths, ChangeEvent, SharedStore, Subscription};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
  pub id: String,
  pub name: String,
  pub price: Money,
  pub price_label: String,
  pub stock: i64,
  pub in_stock: bool,
  pub pre_order: bool,
  pub image_src: String,
  pub description: String,
}

impl From<Product> for CatalogItem {
  fn from(p: Product) -> Self {
    let in_stock = p.in_stock();
    CatalogItem {
      price_label: p.price.display(),
      image_src: image_src(p.image.as_deref()),
      in_stock,
      pre_order: !in_stock,
      id: p.id,
      name: p.name,
      price: p.price,
      stock: p.stock,
      description: p.description,
    }
  }
}

/// A cart entry joined with its product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: String,
  pub name: String,
  pub price: Money,
  pub image: String,
  pub quantity: u32,
  pub is_pre_order: bool,
}

impl CartLine {
  pub fn line_total(&self) -> Money {
    self.price * self.quantity
  }

  pub fn to_line_item(&self) -> LineItem {
    LineItem {
      product_id: self.product_id.clone(),
      name: self.name.clone(),
      price: self.price,
      quantity: self.quantity,
      is_pre_order: self.is_pre_order,
      image: Some(self.image.clone()).filter(|i| !i.is_empty()),
    }
  }
}

/// Turns a stored image payload into something an `<img src>` accepts.
/// Bare base64 starting with `/9j` is JPEG, anything else bare is assumed PNG.
pub fn image_src(raw: Option<&str>) -> String {
  match raw.map(str::trim) {
    None | Some("") => String::new(),
    Some(data) if data.starts_with("data:image") => data.to_string(),
    Some(data) if data.starts_with("/9j") => format!("data:image/jpeg;base64,{}", data),
    Some(data) => format!("data:image/png;base64,{}", data),
  }
}

fn project(tree: Option<&Value>) -> Vec<CatalogItem> {
  tree
    .map(|value| {
      children(value)
        .into_iter()
        .map(|(id, record)| CatalogItem::from(Product::from_record(&id, record)))
        .collect()
    })
    .unwrap_or_default()
}

/// Joins a cart map against the catalog. Products that no longer exist show as
/// "Unknown", price zero, pre-order.
pub fn join(items: &[CatalogItem], cart: &CartMap) -> Vec<CartLine> {
  let by_id: HashMap<&str, &CatalogItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
  cart
    .iter()
    .map(|(product_id, quantity)| match by_id.get(product_id.as_str()) {
      Some(item) => CartLine {
        product_id: product_id.clone(),
        name: item.name.clone(),
        price: item.price,
        image: item.image_src.clone(),
        quantity: *quantity,
        is_pre_order: item.pre_order,
      },
      None => CartLine {
        product_id: product_id.clone(),
        name: "Unknown".to_string(),
        price: Money::ZERO,
        image: String::new(),
        quantity: *quantity,
        is_pre_order: true,
      },
    })
    .collect()
}

#[derive(Clone)]
pub struct CatalogReader {
  store: SharedStore,
}

impl CatalogReader {
  pub fn new(store: SharedStore) -> Self {
    CatalogReader { store }
  }

  #[instrument(name = "CatalogReader::list", skip(self))]
  pub async fn list(&self) -> ShopResult<Vec<CatalogItem>> {
    let tree = self.store.get(&paths::products()).await?;
    let items = project(tree.as_ref());
    event!(Level::DEBUG, count = items.len(), "Catalog listed.");
    Ok(items)
  }

  pub async fn get(&self, product_id: &str) -> ShopResult<Option<CatalogItem>> {
    if !is_key(product_id) {
      return Ok(None);
    }
    let record = self.store.get(&paths::product(product_id)).await?;
    Ok(record.map(|r| CatalogItem::from(Product::from_record(product_id, &r))))
  }

  /// Realtime projection: `listener` gets the full list now and after every change.
  pub fn watch(&self, listener: impl Fn(Vec<CatalogItem>) + Send + Sync + 'static) -> Subscription {
    self.store.subscribe(
      &paths::products(),
      Arc::new(move |change: &ChangeEvent| listener(project(change.value.as_ref()))),
    )
  }

  pub async fn join_cart(&self, cart: &CartMap) -> ShopResult<Vec<CartLine>> {
    if cart.is_empty() {
      return Ok(Vec::new());
    }
    let items = self.list().await?;
    Ok(join(&items, cart))
  }
}
