//! Flat scalar tags attached to a record for querying only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar tag value. Serialises to the bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
  Bool(bool),
  Int(i64),
  Text(String),
}

/// The tag set of a record. Ordered so that serialised tag sets are stable.
pub type Tags = BTreeMap<String, TagValue>;

impl TagValue {
  /// Convert a JSON scalar into a tag value. Returns `None` for `null`,
  /// floats, arrays and objects, which are not valid tag values.
  pub fn from_json(value: &serde_json::Value) -> Option<Self> {
    match value {
      serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
      serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
      serde_json::Value::String(s) => Some(Self::Text(s.clone())),
      _ => None,
    }
  }
}

impl From<bool> for TagValue {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<i64> for TagValue {
  fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<i32> for TagValue {
  fn from(n: i32) -> Self { Self::Int(n.into()) }
}

impl From<String> for TagValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&str> for TagValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

/// Build a [`Tags`] map from `(key, value)` pairs.
pub fn tags<K, V, I>(pairs: I) -> Tags
where
  I: IntoIterator<Item = (K, V)>,
  K: Into<String>,
  V: Into<TagValue>,
{
  pairs
    .into_iter()
    .map(|(k, v)| (k.into(), v.into()))
    .collect()
}
