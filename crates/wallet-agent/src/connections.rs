//! [`ConnectionService`]: connections established through OOBIs.
//!
//! Connecting emits a `Pending` event, resolves the OOBI through the agent,
//! persists the connection metadata and emits `Confirmed`. There is no failed
//! event: a failure is returned to the caller after `Pending` has fired.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use wallet_core::{
  ErrorKind,
  agent::IdentityAgent,
  records::{ConnectionMetadata, ConnectionNote, ConnectionNoteRecord, ConnectionRecord},
  store::RecordStore,
};

use crate::{
  AgentConfig, Error, Result,
  error::agent_err,
  events::{ConnectionEvents, ConnectionStateChanged, ConnectionStatus, Subscription},
  oobi::{OobiResolver, ResolvedOobi},
  repository::{CascadeReport, ConnectionRepository},
};

/// Characters left as-is in a URI component: alphanumerics and
/// `- _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'!')
  .remove(b'~')
  .remove(b'*')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')');

// ─── View types ──────────────────────────────────────────────────────────────

/// Summary of a stored connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionShortDetails {
  pub id:              String,
  pub label:           String,
  pub connection_date: DateTime<Utc>,
  pub status:          ConnectionStatus,
  pub oobi:            String,
}

impl From<&ConnectionRecord> for ConnectionShortDetails {
  fn from(record: &ConnectionRecord) -> Self {
    Self {
      id:              record.id.clone(),
      label:           record.content.alias.clone(),
      connection_date: record.created_at,
      status:          ConnectionStatus::Confirmed,
      oobi:            record.content.oobi.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionNoteDetails {
  pub id:      String,
  pub title:   String,
  pub message: String,
}

impl From<ConnectionNoteRecord> for ConnectionNoteDetails {
  fn from(note: ConnectionNoteRecord) -> Self {
    Self {
      id:      note.id,
      title:   note.content.title,
      message: note.content.message,
    }
  }
}

/// A connection as seen by the agent, joined with local metadata and notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
  pub id:                String,
  pub label:             String,
  pub connection_date:   DateTime<Utc>,
  pub status:            ConnectionStatus,
  pub service_endpoints: Vec<String>,
  pub notes:             Vec<ConnectionNoteDetails>,
}

/// Title and body of a note, as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionNoteProps {
  pub title:   String,
  pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionHistoryType {
  CredentialAccepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHistoryItem {
  #[serde(rename = "type")]
  pub kind:            ConnectionHistoryType,
  pub timestamp:       DateTime<Utc>,
  pub credential_type: String,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct ConnectionService<S, A> {
  repository: ConnectionRepository<S>,
  agent:      Arc<A>,
  resolver:   OobiResolver,
  events:     ConnectionEvents,
  /// Serialises [`Self::sync_keria_contacts`].
  sync_lock:  tokio::sync::Mutex<()>,
  config:     AgentConfig,
}

impl<S, A> ConnectionService<S, A>
where
  S: RecordStore,
  A: IdentityAgent,
{
  pub fn new(store: Arc<S>, agent: Arc<A>, config: AgentConfig) -> Self {
    Self {
      repository: ConnectionRepository::new(store),
      agent,
      resolver: OobiResolver::new(&config),
      events: ConnectionEvents::new(),
      sync_lock: tokio::sync::Mutex::new(()),
      config,
    }
  }

  pub fn repository(&self) -> &ConnectionRepository<S> { &self.repository }

  pub fn events(&self) -> &ConnectionEvents { &self.events }

  /// Register a listener for connection state changes.
  pub fn on_connection_state_changed<F>(&self, listener: F) -> Subscription
  where
    F: Fn(&ConnectionStateChanged) + Send + Sync + 'static,
  {
    self.events.subscribe(listener)
  }

  // ── OOBI ──────────────────────────────────────────────────────────────────

  /// Resolve an OOBI through the agent. Repeated calls for a URL that has
  /// already resolved return the cached result without contacting the agent.
  pub async fn resolve_oobi(&self, url: &str) -> Result<ResolvedOobi> {
    self.resolver.resolve(self.agent.as_ref(), url).await
  }

  /// Establish a connection from an OOBI and return its identifier.
  pub async fn connect_by_oobi_url(&self, url: &str) -> Result<String> {
    self.events.emit(&ConnectionStateChanged {
      connection_id: None,
      status:        ConnectionStatus::Pending,
    });

    let resolved = self.resolve_oobi(url).await?;
    let connection_id = resolved
      .identifier()
      .ok_or_else(|| Error::OobiResolutionFailed {
        url:    url.to_owned(),
        reason: "operation response carries no identifier".to_owned(),
      })?
      .to_owned();

    self
      .repository
      .save_connection(&connection_id, ConnectionMetadata {
        alias: resolved.alias.clone(),
        oobi:  url.to_owned(),
      })
      .await?;

    tracing::info!(connection_id = %connection_id, alias = %resolved.alias, "connection confirmed");
    self.events.emit(&ConnectionStateChanged {
      connection_id: Some(connection_id.clone()),
      status:        ConnectionStatus::Confirmed,
    });
    Ok(connection_id)
  }

  /// Our own OOBI for the identifier named `name`, optionally carrying an
  /// alias for the other side in its `name` parameter.
  pub async fn get_oobi(&self, name: &str, alias: Option<&str>) -> Result<String> {
    let list = self
      .agent
      .get_oobis(name, &self.config.default_role)
      .await
      .map_err(agent_err)?;
    let oobi = list
      .oobis
      .into_iter()
      .next()
      .ok_or_else(|| Error::NoOobi(name.to_owned()))?;

    Ok(match alias {
      Some(alias) => {
        format!("{oobi}?name={}", utf8_percent_encode(alias, URI_COMPONENT))
      }
      None => oobi,
    })
  }

  // ── Sync ──────────────────────────────────────────────────────────────────

  /// Create local metadata for every agent contact not yet stored locally.
  ///
  /// One-directional: local connections missing from the agent are kept.
  /// Returns the ids of the connections created.
  pub async fn sync_keria_contacts(&self) -> Result<Vec<String>> {
    let _guard = self.sync_lock.lock().await;

    let contacts = self.agent.list_contacts().await.map_err(agent_err)?;
    let known: HashSet<String> = self
      .repository
      .all_connections()
      .await?
      .into_iter()
      .map(|c| c.id)
      .collect();

    let mut created = Vec::new();
    for contact in contacts.into_iter().filter(|c| !known.contains(&c.id)) {
      let metadata = ConnectionMetadata {
        alias: contact.alias,
        oobi:  contact.oobi,
      };
      match self.repository.save_connection(&contact.id, metadata).await {
        Ok(_) => created.push(contact.id),
        Err(e) if e.kind() == ErrorKind::DuplicateId => {
          tracing::debug!(connection_id = %contact.id, "contact stored concurrently");
        }
        Err(e) => return Err(e),
      }
    }

    if !created.is_empty() {
      tracing::info!(count = created.len(), "synced agent contacts");
    }
    Ok(created)
  }

  // ── Connections ───────────────────────────────────────────────────────────

  pub async fn get_connections(&self) -> Result<Vec<ConnectionShortDetails>> {
    let records = self.repository.all_connections().await?;
    Ok(records.iter().map(ConnectionShortDetails::from).collect())
  }

  pub async fn get_connection_short_detail_by_id(
    &self,
    id: &str,
  ) -> Result<ConnectionShortDetails> {
    let record = self.repository.get_connection(id).await?;
    Ok(ConnectionShortDetails::from(&record))
  }

  /// Full details: the agent's view of the contact plus local metadata and
  /// notes.
  pub async fn get_connection_by_id(&self, id: &str) -> Result<ConnectionDetails> {
    let contact = self.agent.get_contact(id).await.map_err(agent_err)?;
    let metadata = self.repository.get_connection(&contact.id).await?;
    let notes = self.repository.notes_for_connection(&contact.id).await?;

    Ok(ConnectionDetails {
      id:                contact.id,
      label:             contact.alias,
      connection_date:   metadata.created_at,
      status:            ConnectionStatus::Confirmed,
      service_endpoints: vec![contact.oobi],
      notes:             notes.into_iter().map(ConnectionNoteDetails::from).collect(),
    })
  }

  /// Delete a connection's metadata and its notes.
  pub async fn delete_connection_by_id(&self, id: &str) -> Result<CascadeReport> {
    self.repository.delete_connection(id).await
  }

  /// Credential events for a connection, oldest first.
  pub async fn get_connection_history_by_id(
    &self,
    connection_id: &str,
  ) -> Result<Vec<ConnectionHistoryItem>> {
    let mut history: Vec<ConnectionHistoryItem> = self
      .repository
      .credentials_for_connection(connection_id)
      .await?
      .into_iter()
      .map(|record| ConnectionHistoryItem {
        kind:            ConnectionHistoryType::CredentialAccepted,
        timestamp:       record.created_at,
        credential_type: record.content.credential_type,
      })
      .collect();
    history.sort_by_key(|item| item.timestamp);
    Ok(history)
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  pub async fn create_connection_note(
    &self,
    connection_id: &str,
    note: ConnectionNoteProps,
  ) -> Result<ConnectionNoteDetails> {
    let record = self
      .repository
      .save_note(ConnectionNote {
        connection_id: connection_id.to_owned(),
        title:         note.title,
        message:       note.message,
      })
      .await?;
    Ok(record.into())
  }

  pub async fn update_connection_note_by_id(
    &self,
    note_id: &str,
    note: ConnectionNoteProps,
  ) -> Result<ConnectionNoteDetails> {
    let mut record = self
      .repository
      .find_note(note_id)
      .await?
      .ok_or_else(|| Error::ConnectionNoteNotFound(note_id.to_owned()))?;
    record.content.title = note.title;
    record.content.message = note.message;
    Ok(self.repository.update_note(&record).await?.into())
  }

  pub async fn delete_connection_note_by_id(&self, note_id: &str) -> Result<()> {
    self.repository.delete_note(note_id).await
  }
}
