//! Error type for `wallet-agent`.

use std::time::Duration;

use thiserror::Error;
use wallet_core::ErrorKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Store(#[from] wallet_core::Error),

  #[error("connection metadata record not found: {0}")]
  ConnectionNotFound(String),

  #[error("connection note record not found: {0}")]
  ConnectionNoteNotFound(String),

  #[error("notification record not found: {0}")]
  NotificationNotFound(String),

  #[error("failed to resolve OOBI {url}: {reason}")]
  OobiResolutionFailed { url: String, reason: String },

  #[error("failed to resolve OOBI {url}: operation not completing after {waited:?}")]
  OobiResolutionTimedOut { url: String, waited: Duration },

  #[error("invalid OOBI url {url:?}: {source}")]
  InvalidOobiUrl {
    url:    String,
    #[source]
    source: url::ParseError,
  },

  #[error("agent has no OOBI for {0}")]
  NoOobi(String),

  #[error("agent error: {0}")]
  Agent(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Store(e) => e.kind(),
      Self::ConnectionNotFound(_)
      | Self::ConnectionNoteNotFound(_)
      | Self::NotificationNotFound(_)
      | Self::NoOobi(_) => ErrorKind::NotFound,
      Self::OobiResolutionFailed { .. } | Self::OobiResolutionTimedOut { .. } => {
        ErrorKind::OobiResolutionFailed
      }
      Self::InvalidOobiUrl { .. } => ErrorKind::Invalid,
      Self::Agent(_) => ErrorKind::Agent,
    }
  }
}

/// Lift a backend error into [`Error::Store`].
pub(crate) fn store_err<E: Into<wallet_core::Error>>(e: E) -> Error {
  Error::Store(e.into())
}

pub(crate) fn agent_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Agent(Box::new(e))
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
