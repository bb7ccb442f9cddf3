//! Typed access to connection records.
//!
//! The store knows nothing about the link between a note and its connection;
//! this repository owns that relationship, including the cascade on delete.

use std::sync::Arc;

use uuid::Uuid;
use wallet_core::{
  ErrorKind,
  query::Query,
  record::{RecordContent, TypedRecord},
  records::{
    CONNECTION_ID_TAG, ConnectionMetadata, ConnectionNote, ConnectionNoteRecord,
    ConnectionRecord, CredentialMetadata, CredentialMetadataRecord,
  },
  store::RecordStore,
};

use crate::{
  Error, Result,
  error::store_err,
};

/// Outcome of deleting a connection together with its notes.
///
/// Notes are removed one at a time with no transaction; a failure part-way
/// leaves earlier deletions in place and is reported here.
#[derive(Debug, Default)]
pub struct CascadeReport {
  pub notes_deleted: usize,
  /// `(note id, error)` for every note that could not be deleted.
  pub failures:      Vec<(String, Error)>,
}

impl CascadeReport {
  pub fn is_complete(&self) -> bool { self.failures.is_empty() }
}

pub struct ConnectionRepository<S> {
  store: Arc<S>,
}

impl<S> Clone for ConnectionRepository<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: RecordStore> ConnectionRepository<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Generic helpers ───────────────────────────────────────────────────────

  async fn save<C>(&self, id: Option<String>, content: &C) -> Result<TypedRecord<C>>
  where
    C: RecordContent + Send + Sync,
  {
    let record = self
      .store
      .save(content.to_new_record(id)?)
      .await
      .map_err(store_err)?;
    Ok(TypedRecord::from_record(record)?)
  }

  /// `None` when the id is absent or belongs to a record of another type.
  async fn find<C>(&self, id: &str) -> Result<Option<TypedRecord<C>>>
  where
    C: RecordContent + Send + Sync,
  {
    let record = self.store.find_by_id(id).await.map_err(store_err)?;
    match record {
      Some(r) if r.record_type == C::RECORD_TYPE => Ok(Some(TypedRecord::from_record(r)?)),
      _ => Ok(None),
    }
  }

  /// Delete `id` only if it is a record of type `C`.
  async fn delete_typed<C>(&self, id: &str) -> Result<()>
  where
    C: RecordContent + Send + Sync,
  {
    if let Some(record) = self.find::<C>(id).await? {
      self.store.delete_by_id(&record.id).await.map_err(store_err)?;
    }
    Ok(())
  }

  async fn query<C>(&self, query: &Query) -> Result<Vec<TypedRecord<C>>>
  where
    C: RecordContent + Send + Sync,
  {
    let records = self
      .store
      .find_all_by_query(C::RECORD_TYPE, query)
      .await
      .map_err(store_err)?;
    records
      .into_iter()
      .map(|r| TypedRecord::from_record(r).map_err(Error::from))
      .collect()
  }

  async fn all<C>(&self) -> Result<Vec<TypedRecord<C>>>
  where
    C: RecordContent + Send + Sync,
  {
    let records = self.store.get_all(C::RECORD_TYPE).await.map_err(store_err)?;
    records
      .into_iter()
      .map(|r| TypedRecord::from_record(r).map_err(Error::from))
      .collect()
  }

  // ── Connections ───────────────────────────────────────────────────────────

  /// Persist metadata for the connection whose remote identifier is `id`.
  pub async fn save_connection(
    &self,
    id: &str,
    metadata: ConnectionMetadata,
  ) -> Result<ConnectionRecord> {
    self.save(Some(id.to_owned()), &metadata).await
  }

  pub async fn find_connection(&self, id: &str) -> Result<Option<ConnectionRecord>> {
    self.find(id).await
  }

  /// Like [`Self::find_connection`], but a missing connection is an error.
  pub async fn get_connection(&self, id: &str) -> Result<ConnectionRecord> {
    self
      .find_connection(id)
      .await?
      .ok_or_else(|| Error::ConnectionNotFound(id.to_owned()))
  }

  pub async fn all_connections(&self) -> Result<Vec<ConnectionRecord>> {
    self.all().await
  }

  /// Delete a connection and then each note tagged with its id. An id that
  /// is absent or names a record of another type leaves that record alone.
  pub async fn delete_connection(&self, id: &str) -> Result<CascadeReport> {
    self.delete_typed::<ConnectionMetadata>(id).await?;

    let mut report = CascadeReport::default();
    for note in self.notes_for_connection(id).await? {
      match self.store.delete_by_id(&note.id).await {
        Ok(()) => report.notes_deleted += 1,
        Err(e) => {
          let e = store_err(e);
          tracing::warn!(connection_id = id, note_id = %note.id, error = %e, "failed to delete note");
          report.failures.push((note.id, e));
        }
      }
    }
    Ok(report)
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  /// Persist a new note under a generated id.
  pub async fn save_note(&self, note: ConnectionNote) -> Result<ConnectionNoteRecord> {
    self.save(Some(Uuid::new_v4().to_string()), &note).await
  }

  pub async fn find_note(&self, id: &str) -> Result<Option<ConnectionNoteRecord>> {
    self.find(id).await
  }

  /// Overwrite an existing note.
  pub async fn update_note(&self, note: &ConnectionNoteRecord) -> Result<ConnectionNoteRecord> {
    match self.store.update(note.to_record()?).await {
      Ok(record) => Ok(TypedRecord::from_record(record)?),
      Err(e) => {
        let e: wallet_core::Error = e.into();
        if e.kind() == ErrorKind::NotFound {
          return Err(Error::ConnectionNoteNotFound(note.id.clone()));
        }
        Err(Error::Store(e))
      }
    }
  }

  /// Delete a note; an absent id, or one naming another record type, is a
  /// no-op.
  pub async fn delete_note(&self, id: &str) -> Result<()> {
    self.delete_typed::<ConnectionNote>(id).await
  }

  pub async fn notes_for_connection(
    &self,
    connection_id: &str,
  ) -> Result<Vec<ConnectionNoteRecord>> {
    self.query(&Query::tag_eq(CONNECTION_ID_TAG, connection_id)).await
  }

  // ── Credential metadata ───────────────────────────────────────────────────

  pub async fn save_credential_metadata(
    &self,
    id: &str,
    metadata: CredentialMetadata,
  ) -> Result<CredentialMetadataRecord> {
    self.save(Some(id.to_owned()), &metadata).await
  }

  pub async fn credentials_for_connection(
    &self,
    connection_id: &str,
  ) -> Result<Vec<CredentialMetadataRecord>> {
    self.query(&Query::tag_eq(CONNECTION_ID_TAG, connection_id)).await
  }
}
