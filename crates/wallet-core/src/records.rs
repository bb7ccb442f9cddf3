//! Typed payloads for the record kinds the wallet core reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  record::{RecordContent, RecordType, TypedRecord},
  tag::{TagValue, Tags, tags},
};

/// Tag key linking notes and credential metadata to their connection.
pub const CONNECTION_ID_TAG: &str = "connectionId";
/// Tag key carrying a projected notification's route.
pub const ROUTE_TAG: &str = "route";
pub const IS_READ_TAG: &str = "isRead";

// ─── Connections ─────────────────────────────────────────────────────────────

/// Local metadata for a connection. The record id is the remote identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMetadata {
  pub alias: String,
  /// The out-of-band invitation the connection was established from.
  pub oobi:  String,
}

impl RecordContent for ConnectionMetadata {
  const RECORD_TYPE: RecordType = RecordType::ConnectionKeriMetadata;
}

/// A free-text note the user attached to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionNote {
  pub connection_id: String,
  pub title:         String,
  pub message:       String,
}

impl RecordContent for ConnectionNote {
  const RECORD_TYPE: RecordType = RecordType::ConnectionNote;

  fn tags(&self) -> Tags { tags([(CONNECTION_ID_TAG, self.connection_id.as_str())]) }
}

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Local metadata about a credential received over a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialMetadata {
  pub connection_id:   String,
  pub credential_type: String,
}

impl RecordContent for CredentialMetadata {
  const RECORD_TYPE: RecordType = RecordType::CredentialMetadataRecord;

  fn tags(&self) -> Tags { tags([(CONNECTION_ID_TAG, self.connection_id.as_str())]) }
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// The local projection of an inbound agent notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeriNotification {
  pub route:   String,
  /// Digest of the exchange message the notification refers to.
  pub digest:  String,
  pub read_at: Option<DateTime<Utc>>,
}

impl RecordContent for KeriNotification {
  const RECORD_TYPE: RecordType = RecordType::NotificationKeri;

  fn tags(&self) -> Tags {
    Tags::from([
      (ROUTE_TAG.to_owned(), TagValue::from(self.route.as_str())),
      (IS_READ_TAG.to_owned(), TagValue::from(self.read_at.is_some())),
    ])
  }
}

pub type ConnectionRecord = TypedRecord<ConnectionMetadata>;
pub type ConnectionNoteRecord = TypedRecord<ConnectionNote>;
pub type CredentialMetadataRecord = TypedRecord<CredentialMetadata>;
pub type KeriNotificationRecord = TypedRecord<KeriNotification>;
