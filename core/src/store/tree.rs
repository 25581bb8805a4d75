// storefront/src/store/tree.rs

//! Navigation and mutation of a `serde_json::Value` tree with realtime-database semantics:
//! `null` means absent, empty objects do not exist, and arrays can be addressed by index.

use serde_json::{Map, Value};

/// Value at `segments`, treating `null` as absent.
pub fn get_at<'a>(node: &'a Value, segments: &[String]) -> Option<&'a Value> {
  let mut current = node;
  for segment in segments {
    current = match current {
      Value::Object(map) => map.get(segment)?,
      Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
      _ => return None,
    };
  }
  if is_vacant(current) {
    None
  } else {
    Some(current)
  }
}

/// Writes `value` at `segments`. `null` deletes; parents emptied by a delete are pruned.
pub fn set_at(node: &mut Value, segments: &[String], value: Value) {
  let Some((head, rest)) = segments.split_first() else {
    *node = normalize(value);
    return;
  };

  if !node.is_object() {
    *node = into_object(node.take());
  }
  let Value::Object(map) = node else {
    return;
  };

  if rest.is_empty() && is_vacant(&value) {
    map.remove(head);
    return;
  }

  let child = map.entry(head.clone()).or_insert(Value::Null);
  set_at(child, rest, value);
  if is_vacant(child) {
    map.remove(head);
  }
}

/// `null`, `{}` and `[]` are all "nothing here".
pub fn is_vacant(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Object(map) => map.is_empty(),
    Value::Array(items) => items.is_empty(),
    _ => false,
  }
}

/// Strips `null` members and empty containers out of objects, recursively.
pub fn normalize(value: Value) -> Value {
  match value {
    Value::Object(map) => {
      let cleaned: Map<String, Value> = map
        .into_iter()
        .map(|(k, v)| (k, normalize(v)))
        .filter(|(_, v)| !is_vacant(v))
        .collect();
      if cleaned.is_empty() {
        Value::Null
      } else {
        Value::Object(cleaned)
      }
    }
    Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
    other => other,
  }
}

fn into_object(value: Value) -> Value {
  match value {
    Value::Array(items) => Value::Object(
      items
        .into_iter()
        .enumerate()
        .filter(|(_, v)| !is_vacant(v))
        .map(|(idx, v)| (idx.to_string(), v))
        .collect(),
    ),
    Value::Object(map) => Value::Object(map),
    _ => Value::Object(Map::new()),
  }
}

/// Children of a container as `(key, value)` pairs: object members in key order,
/// array elements keyed by index. Vacant children are skipped.
pub fn children(value: &Value) -> Vec<(String, &Value)> {
  match value {
    Value::Object(map) => map.iter().filter(|(_, v)| !is_vacant(v)).map(|(k, v)| (k.clone(), v)).collect(),
    Value::Array(items) => items
      .iter()
      .enumerate()
      .filter(|(_, v)| !is_vacant(v))
      .map(|(idx, v)| (idx.to_string(), v))
      .collect(),
    _ => Vec::new(),
  }
}

/// Lenient integer read: numbers (truncated) or numeric strings; anything else is `None`.
pub fn as_i64_lenient(value: Option<&Value>) -> Option<i64> {
  match value? {
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
    Value::String(s) => {
      let trimmed = s.trim();
      trimmed.parse::<i64>().ok().or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
    }
    _ => None,
  }
}

/// First non-empty string among `keys` on an object.
pub fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
  keys
    .iter()
    .filter_map(|k| value.get(*k))
    .filter_map(Value::as_str)
    .find(|s| !s.trim().is_empty())
}

/// First present, non-null member among `keys`.
pub fn first_present<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
  keys.iter().filter_map(|k| value.get(*k)).find(|v| !v.is_null())
}
