//! Encoding and decoding helpers between wallet-core types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; content and tags as compact
//! JSON; record types as their discriminant string.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use wallet_core::{
  record::{Record, RecordType},
  tag::Tags,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── RecordType ──────────────────────────────────────────────────────────────

pub fn encode_record_type(t: RecordType) -> &'static str { t.into() }

pub fn decode_record_type(s: &str) -> Result<RecordType> {
  RecordType::from_str(s).map_err(|_| Error::UnknownRecordType(s.to_owned()))
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &Tags) -> Result<String> { Ok(serde_json::to_string(tags)?) }

pub fn decode_tags(s: &str) -> Result<Tags> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const RECORD_COLUMNS: &str =
  "id, record_type, content_json, tags_json, created_at, updated_at";

/// Raw strings read directly from a `records` row.
pub struct RawRecord {
  pub id:           String,
  pub record_type:  String,
  pub content_json: String,
  pub tags_json:    String,
  pub created_at:   String,
  pub updated_at:   Option<String>,
}

impl RawRecord {
  /// Map a row selected with [`RECORD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      record_type:  row.get(1)?,
      content_json: row.get(2)?,
      tags_json:    row.get(3)?,
      created_at:   row.get(4)?,
      updated_at:   row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      id:          self.id,
      record_type: decode_record_type(&self.record_type)?,
      content:     serde_json::from_str(&self.content_json)?,
      tags:        decode_tags(&self.tags_json)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  self.updated_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
