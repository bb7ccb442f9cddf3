//! The `RecordStore` and `Preferences` traits.
//!
//! Implemented by storage backends (e.g. `wallet-store-sqlite`). The services
//! in `wallet-agent` depend on these abstractions, not on any concrete backend.

use std::future::Future;

use crate::{
  query::Query,
  record::{NewRecord, Record, RecordType},
};

// ─── RecordStore ─────────────────────────────────────────────────────────────

/// Abstraction over a tagged record store.
///
/// Opening the store is the backend's constructor: a value implementing this
/// trait is always ready for use.
///
/// Backend errors must convert into [`crate::Error`] so that callers can
/// classify them with [`crate::Error::kind`]; a missing record on `update` or
/// `delete` converts to [`crate::Error::RecordNotFound`] and a taken id on
/// `save` to [`crate::Error::DuplicateId`].
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Persist a new record. The store assigns `created_at`, and an id when the
  /// input has none. Fails if the id is already taken by a record of any
  /// type.
  fn save(
    &self,
    record: NewRecord,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn find_by_id<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// All records of `record_type` whose tags satisfy `query`. Order is
  /// unspecified.
  fn find_all_by_query<'a>(
    &'a self,
    record_type: RecordType,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// All records of `record_type`.
  fn get_all(
    &self,
    record_type: RecordType,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  /// Overwrite the content and tags of an existing record and stamp
  /// `updated_at`. Returns the stored record. The stored row must match both
  /// `id` and `record_type`; otherwise the record is not found.
  fn update(
    &self,
    record: Record,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Delete an existing record; fails if no record with this id and type is
  /// present.
  fn delete<'a>(
    &'a self,
    record: &'a Record,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a record by id. Deleting an absent id is a no-op.
  fn delete_by_id<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Preferences ─────────────────────────────────────────────────────────────

/// A small key-value preference store kept beside the records.
pub trait Preferences: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Read a preference. A missing key is an error
  /// ([`crate::Error::PreferenceKeyNotFound`]), not `None`.
  fn get_preference<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<serde_json::Value, Self::Error>> + Send + 'a;

  fn set_preference<'a>(
    &'a self,
    key: &'a str,
    value: serde_json::Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove a preference; removing an absent key is a no-op.
  fn remove_preference<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
