// storefront/src/money.rs

//! Currency amounts. Stored in the document tree as decimal numbers in major units,
//! held in Rust as integer centavos.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
  pub const ZERO: Money = Money(0);

  pub fn from_cents(cents: i64) -> Self {
    Money(cents)
  }

  /// Converts a decimal amount (e.g. `150.5`) into centavos, rounding half away from zero.
  pub fn from_major(amount: f64) -> Self {
    if !amount.is_finite() {
      return Money::ZERO;
    }
    Money((amount * 100.0).round() as i64)
  }

  /// Lenient read of a price field: numbers, numeric strings, anything else is zero.
  pub fn from_value(value: Option<&serde_json::Value>) -> Self {
    match value {
      Some(serde_json::Value::Number(n)) => n.as_f64().map(Money::from_major).unwrap_or_default(),
      Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().map(Money::from_major).unwrap_or_default(),
      _ => Money::ZERO,
    }
  }

  pub fn cents(self) -> i64 {
    self.0
  }

  pub fn as_major(self) -> f64 {
    self.0 as f64 / 100.0
  }

  /// `₱1,234.50`
  pub fn display(self) -> String {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs = self.0.unsigned_abs();
    let whole = (abs / 100).to_string();
    let frac = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
      if idx > 0 && (whole.len() - idx) % 3 == 0 {
        grouped.push(',');
      }
      grouped.push(ch);
    }
    format!("{}₱{}.{:02}", sign, grouped, frac)
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.display())
  }
}

impl Add for Money {
  type Output = Money;
  fn add(self, rhs: Money) -> Money {
    Money(self.0 + rhs.0)
  }
}

impl Mul<u32> for Money {
  type Output = Money;
  fn mul(self, rhs: u32) -> Money {
    Money(self.0 * i64::from(rhs))
  }
}

impl Sum for Money {
  fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
    iter.fold(Money::ZERO, Add::add)
  }
}

impl Serialize for Money {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    if self.0 % 100 == 0 {
      serializer.serialize_i64(self.0 / 100)
    } else {
      serializer.serialize_f64(self.as_major())
    }
  }
}

impl<'de> Deserialize<'de> for Money {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct MoneyVisitor;

    impl<'de> Visitor<'de> for MoneyVisitor {
      type Value = Money;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a number or numeric string")
      }

      fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money(v * 100))
      }

      fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money(v as i64 * 100))
      }

      fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Ok(Money::from_major(v))
      }

      fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.trim().parse::<f64>().map(Money::from_major).map_err(E::custom)
      }

      fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
      }
    }

    deserializer.deserialize_any(MoneyVisitor)
  }
}
