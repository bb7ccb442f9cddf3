//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use wallet_core::{
  query::Query,
  record::{NewRecord, Record, RecordType},
  store::RecordStore,
};

use crate::{
  encode::{
    RECORD_COLUMNS, RawRecord, encode_dt, encode_record_type, encode_tags,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A wallet record store backed by a single SQLite file.
///
/// Clones share one background connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  /// Opening the same path again yields a handle onto the same data.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "opening record store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every row of one record type, in insertion order.
  async fn scan(&self, record_type: RecordType) -> Result<Vec<Record>> {
    let type_str = encode_record_type(record_type);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM records WHERE record_type = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![type_str], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn save(&self, input: NewRecord) -> Result<Record> {
    let record = Record {
      id:          input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
      record_type: input.record_type,
      content:     input.content,
      tags:        input.tags,
      created_at:  Utc::now(),
      updated_at:  None,
    };

    let id_str      = record.id.clone();
    let type_str    = encode_record_type(record.record_type);
    let content_str = record.content.to_string();
    let tags_str    = encode_tags(&record.tags)?;
    let at_str      = encode_dt(record.created_at);

    let inserted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO records
             (id, record_type, content_json, tags_json, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
          rusqlite::params![id_str, type_str, content_str, tags_str, at_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(wallet_core::Error::DuplicateId(record.id).into());
    }
    Ok(record)
  }

  async fn find_by_id(&self, id: &str) -> Result<Option<Record>> {
    let id_str = id.to_owned();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
            rusqlite::params![id_str],
            RawRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn find_all_by_query(
    &self,
    record_type: RecordType,
    query:       &Query,
  ) -> Result<Vec<Record>> {
    // Tags are opaque JSON to SQLite; filter the type scan in process.
    let mut records = self.scan(record_type).await?;
    records.retain(|r| query.matches(&r.tags));
    Ok(records)
  }

  async fn get_all(&self, record_type: RecordType) -> Result<Vec<Record>> {
    self.scan(record_type).await
  }

  async fn update(&self, mut record: Record) -> Result<Record> {
    let now = Utc::now();

    let id_str      = record.id.clone();
    let type_str    = encode_record_type(record.record_type);
    let content_str = record.content.to_string();
    let tags_str    = encode_tags(&record.tags)?;
    let at_str      = encode_dt(now);

    // A row with this id but another type counts as missing.
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE records
             SET content_json = ?3, tags_json = ?4, updated_at = ?5
           WHERE id = ?1 AND record_type = ?2",
          rusqlite::params![id_str, type_str, content_str, tags_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(wallet_core::Error::RecordNotFound(record.id).into());
    }
    record.updated_at = Some(now);
    Ok(record)
  }

  async fn delete(&self, record: &Record) -> Result<()> {
    let removed = self.delete_row(&record.id, Some(record.record_type)).await?;
    if removed == 0 {
      return Err(wallet_core::Error::RecordNotFound(record.id.clone()).into());
    }
    Ok(())
  }

  async fn delete_by_id(&self, id: &str) -> Result<()> {
    self.delete_row(id, None).await?;
    Ok(())
  }
}

impl SqliteStore {
  /// Delete one row, optionally only if it has the given type. Returns how
  /// many rows were removed (0 or 1).
  async fn delete_row(&self, id: &str, record_type: Option<RecordType>) -> Result<usize> {
    let id_str   = id.to_owned();
    let type_str = record_type.map(encode_record_type);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM records WHERE id = ?1 AND (?2 IS NULL OR record_type = ?2)",
          rusqlite::params![id_str, type_str],
        )?)
      })
      .await?;
    Ok(removed)
  }
}
