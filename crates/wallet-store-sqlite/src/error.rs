//! Error type for `wallet-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] wallet_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown record type: {0:?}")]
  UnknownRecordType(String),
}

impl From<Error> for wallet_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => Self::Storage(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
