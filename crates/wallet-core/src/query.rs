//! Boolean query algebra over record tags.
//!
//! A query is evaluated as a pure predicate over a record's [`Tags`]. Storage
//! backends either apply [`Query::matches`] to a type scan or push the
//! predicate down where they can; the semantics are defined here only.

use serde_json::Value;

use crate::{
  Error, Result,
  tag::{TagValue, Tags},
};

/// A tag query.
///
/// - `Match` is the AND of exact equality on every listed tag. An empty
///   `Match` matches every record.
/// - `And` of no sub-queries matches everything; `Or` of none matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
  Match(Tags),
  And(Vec<Query>),
  Or(Vec<Query>),
  Not(Box<Query>),
}

impl Default for Query {
  fn default() -> Self { Self::all() }
}

impl From<Tags> for Query {
  fn from(tags: Tags) -> Self { Self::Match(tags) }
}

impl Query {
  /// The query that matches every record.
  pub fn all() -> Self { Self::Match(Tags::new()) }

  /// Single-tag equality.
  pub fn tag_eq(key: impl Into<String>, value: impl Into<TagValue>) -> Self {
    Self::Match(Tags::from([(key.into(), value.into())]))
  }

  pub fn negate(query: Query) -> Self { Self::Not(Box::new(query)) }

  /// Evaluate the query against a tag set.
  pub fn matches(&self, tags: &Tags) -> bool {
    match self {
      Self::Match(wanted) => {
        wanted.iter().all(|(k, v)| tags.get(k) == Some(v))
      }
      Self::And(queries) => queries.iter().all(|q| q.matches(tags)),
      Self::Or(queries) => queries.iter().any(|q| q.matches(tags)),
      Self::Not(query) => !query.matches(tags),
    }
  }

  /// Parse the JSON query shape used by the wallet's record queries:
  ///
  /// ```json
  /// { "connectionId": "E123", "$not": { "isRead": true } }
  /// ```
  ///
  /// Plain keys become equality matches; `$and` / `$or` take arrays of
  /// sub-queries and `$not` takes a single sub-query. When an object mixes
  /// several of these, they are combined with AND.
  pub fn from_json(value: &Value) -> Result<Self> {
    let Value::Object(map) = value else {
      return Err(Error::InvalidQuery(format!("expected an object, got {value}")));
    };

    let mut simple = Tags::new();
    let mut parts = Vec::new();

    for (key, v) in map {
      match key.as_str() {
        "$and" => parts.push(Self::And(Self::parse_list(key, v)?)),
        "$or" => parts.push(Self::Or(Self::parse_list(key, v)?)),
        "$not" => parts.push(Self::negate(Self::from_json(v)?)),
        _ => {
          let tag = TagValue::from_json(v).ok_or_else(|| {
            Error::InvalidQuery(format!("tag {key:?} has non-scalar value {v}"))
          })?;
          simple.insert(key.clone(), tag);
        }
      }
    }

    if parts.is_empty() {
      return Ok(Self::Match(simple));
    }
    if !simple.is_empty() {
      parts.insert(0, Self::Match(simple));
    }
    if parts.len() == 1 {
      return Ok(parts.remove(0));
    }
    Ok(Self::And(parts))
  }

  fn parse_list(key: &str, value: &Value) -> Result<Vec<Self>> {
    let Value::Array(items) = value else {
      return Err(Error::InvalidQuery(format!("{key} expects an array")));
    };
    items.iter().map(Self::from_json).collect()
  }
}
