//! Error types for `wallet-core`.

use thiserror::Error;

use crate::record::RecordType;

/// Stable classification shared by every error in the workspace, so callers
/// can tell "not found" from "duplicate" from "resolution failed" without
/// matching on crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  DuplicateId,
  OobiResolutionFailed,
  PreferenceKeyNotFound,
  /// Malformed input: bad query, bad URL, unexpected record shape.
  Invalid,
  Storage,
  Agent,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("record not found: {0}")]
  RecordNotFound(String),

  #[error("record {0} already exists")]
  DuplicateId(String),

  #[error("KEY_NOT_FOUND: {0}")]
  PreferenceKeyNotFound(String),

  #[error("record {id} is a {found}, expected {expected}")]
  UnexpectedRecordType {
    id:       String,
    expected: RecordType,
    found:    RecordType,
  },

  #[error("invalid query: {0}")]
  InvalidQuery(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::RecordNotFound(_) => ErrorKind::NotFound,
      Self::DuplicateId(_) => ErrorKind::DuplicateId,
      Self::PreferenceKeyNotFound(_) => ErrorKind::PreferenceKeyNotFound,
      Self::UnexpectedRecordType { .. }
      | Self::InvalidQuery(_)
      | Self::Serialization(_) => ErrorKind::Invalid,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
