//! [`Preferences`] on the same SQLite file as the records.

use rusqlite::OptionalExtension as _;
use wallet_core::store::Preferences;

use crate::{Error, Result, SqliteStore};

impl Preferences for SqliteStore {
  type Error = Error;

  async fn get_preference(&self, key: &str) -> Result<serde_json::Value> {
    let key_str = key.to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value_json FROM preferences WHERE key = ?1",
            rusqlite::params![key_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    match raw {
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Err(wallet_core::Error::PreferenceKeyNotFound(key.to_owned()).into()),
    }
  }

  async fn set_preference(&self, key: &str, value: serde_json::Value) -> Result<()> {
    let key_str   = key.to_owned();
    let value_str = value.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO preferences (key, value_json) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
          rusqlite::params![key_str, value_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_preference(&self, key: &str) -> Result<()> {
    let key_str = key.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM preferences WHERE key = ?1",
          rusqlite::params![key_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
