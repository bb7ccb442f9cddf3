//! Records, the unit of persistence in the wallet's tagged record store.
//!
//! Every record carries a JSON payload and a flat tag set. Typed views over
//! records are provided by [`TypedRecord`] for payloads implementing
//! [`RecordContent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Error, Result, tag::Tags};

// ─── RecordType ──────────────────────────────────────────────────────────────

/// The discriminant of a record. Each type is a logical table; ids are unique
/// across all of them. The string forms are the variant names.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
pub enum RecordType {
  ConnectionNote,
  ConnectionKeriMetadata,
  NotificationKeri,
  CredentialMetadataRecord,
  IdentifierMetadataRecord,
  OpPassHint,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id:          String,
  pub record_type: RecordType,
  pub content:     serde_json::Value,
  pub tags:        Tags,
  /// Store-assigned; never changes after creation.
  pub created_at:  DateTime<Utc>,
  /// Set by the store on every update; `None` until the first one.
  pub updated_at:  Option<DateTime<Utc>>,
}

/// Input to [`crate::store::RecordStore::save`]. `created_at` is always set by
/// the store; a missing `id` is generated.
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub id:          Option<String>,
  pub record_type: RecordType,
  pub content:     serde_json::Value,
  pub tags:        Tags,
}

impl NewRecord {
  pub fn new(record_type: RecordType, content: serde_json::Value) -> Self {
    Self {
      id: None,
      record_type,
      content,
      tags: Tags::new(),
    }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn with_tags(mut self, tags: Tags) -> Self {
    self.tags = tags;
    self
  }
}

// ─── Typed records ───────────────────────────────────────────────────────────

/// A payload type stored under a fixed [`RecordType`].
pub trait RecordContent: Serialize + DeserializeOwned {
  const RECORD_TYPE: RecordType;

  /// Tags derived from the payload. Recomputed on every save and update so
  /// they never drift from the content.
  fn tags(&self) -> Tags { Tags::new() }

  /// Build the store input for this payload.
  fn to_new_record(&self, id: Option<String>) -> Result<NewRecord> {
    Ok(NewRecord {
      id,
      record_type: Self::RECORD_TYPE,
      content: serde_json::to_value(self)?,
      tags: self.tags(),
    })
  }
}

/// A record whose payload has been decoded into `C`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedRecord<C> {
  pub id:         String,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub content:    C,
}

impl<C: RecordContent> TypedRecord<C> {
  /// Decode a raw record. Fails if the record is of another type.
  pub fn from_record(record: Record) -> Result<Self> {
    if record.record_type != C::RECORD_TYPE {
      return Err(Error::UnexpectedRecordType {
        id:       record.id,
        expected: C::RECORD_TYPE,
        found:    record.record_type,
      });
    }
    Ok(Self {
      content:    serde_json::from_value(record.content)?,
      id:         record.id,
      created_at: record.created_at,
      updated_at: record.updated_at,
    })
  }

  /// Re-encode for [`crate::store::RecordStore::update`].
  pub fn to_record(&self) -> Result<Record> {
    Ok(Record {
      id:          self.id.clone(),
      record_type: C::RECORD_TYPE,
      content:     serde_json::to_value(&self.content)?,
      tags:        self.content.tags(),
      created_at:  self.created_at,
      updated_at:  self.updated_at,
    })
  }
}
