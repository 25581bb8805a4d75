// storefront/src/orders/id.rs

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::fmt;

static ORDER_ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^ORD-\d{8}-\d{4}$").ok());

/// `ORD-<YYYYMMDD>-<4 random digits>`. Uniqueness is not checked against the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
  /// Today's UTC date with a random suffix.
  pub fn generate() -> Self {
    Self::generate_on(Utc::now().date_naive())
  }

  pub fn generate_on(date: NaiveDate) -> Self {
    let suffix: u16 = rand::thread_rng().gen_range(0..=9999);
    OrderId(format!("ORD-{}-{:04}", date.format("%Y%m%d"), suffix))
  }

  pub fn is_well_formed(raw: &str) -> bool {
    ORDER_ID_PATTERN.as_ref().is_some_and(|re| re.is_match(raw))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_string(self) -> String {
    self.0
  }
}

impl fmt::Display for OrderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
