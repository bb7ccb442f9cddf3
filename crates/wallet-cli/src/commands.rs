//! Subcommands and their handlers.

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use wallet_agent::{
  connections::{ConnectionNoteDetails, ConnectionShortDetails},
  repository::ConnectionRepository,
};
use wallet_core::{
  query::Query,
  record::RecordType,
  records::ConnectionNote,
  store::{Preferences, RecordStore},
};
use wallet_store_sqlite::SqliteStore;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Print the effective configuration.
  Config,
  /// Stored connections.
  #[command(subcommand)]
  Connections(ConnectionsCommand),
  /// Notes attached to connections.
  #[command(subcommand)]
  Notes(NotesCommand),
  /// Raw records of any type.
  #[command(subcommand)]
  Records(RecordsCommand),
  /// Key-value preferences.
  #[command(subcommand)]
  Prefs(PrefsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConnectionsCommand {
  List,
  /// Delete a connection together with its notes.
  Delete { id: String },
}

#[derive(Args, Debug)]
pub struct NoteText {
  #[arg(long)]
  title:   Option<String>,
  #[arg(long)]
  message: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum NotesCommand {
  List { connection_id: String },
  Add {
    connection_id: String,
    #[command(flatten)]
    text:          NoteText,
  },
  /// Change the title and/or message of a note.
  Update {
    note_id: String,
    #[command(flatten)]
    text:    NoteText,
  },
  Delete { note_id: String },
}

#[derive(Subcommand, Debug)]
pub enum RecordsCommand {
  Get { id: String },
  /// Records of one type matching a JSON tag query, e.g.
  /// `{"$or": [{"route": "/multisig/icp"}, {"isRead": false}]}`.
  Query {
    record_type: RecordType,
    /// Defaults to matching every record of the type.
    query:       Option<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommand {
  Get { key: String },
  /// Store a value. Input that is not valid JSON is stored as a string.
  Set { key: String, value: String },
  Remove { key: String },
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

pub async fn run(store: Arc<SqliteStore>, command: Command) -> Result<()> {
  let repo = ConnectionRepository::new(Arc::clone(&store));
  match command {
    Command::Config => bail!("config is handled before the store is opened"),
    Command::Connections(cmd) => connections(&repo, cmd).await,
    Command::Notes(cmd) => notes(&repo, cmd).await,
    Command::Records(cmd) => records(&store, cmd).await,
    Command::Prefs(cmd) => prefs(&store, cmd).await,
  }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn connections(repo: &ConnectionRepository<SqliteStore>, cmd: ConnectionsCommand) -> Result<()> {
  match cmd {
    ConnectionsCommand::List => {
      let all = repo.all_connections().await?;
      let details: Vec<ConnectionShortDetails> = all.iter().map(Into::into).collect();
      print_json(&details)
    }
    ConnectionsCommand::Delete { id } => {
      repo.get_connection(&id).await?;
      let report = repo.delete_connection(&id).await?;
      tracing::info!(connection_id = %id, notes_deleted = report.notes_deleted, "connection deleted");

      let failures: Vec<Value> = report
        .failures
        .iter()
        .map(|(note_id, e)| json!({ "noteId": note_id, "error": e.to_string() }))
        .collect();
      print_json(&json!({ "notesDeleted": report.notes_deleted, "failures": failures }))?;
      if !report.is_complete() {
        bail!("{} note(s) of {id} could not be deleted", report.failures.len());
      }
      Ok(())
    }
  }
}

async fn notes(repo: &ConnectionRepository<SqliteStore>, cmd: NotesCommand) -> Result<()> {
  match cmd {
    NotesCommand::List { connection_id } => {
      let notes: Vec<ConnectionNoteDetails> = repo
        .notes_for_connection(&connection_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
      print_json(&notes)
    }
    NotesCommand::Add { connection_id, text } => {
      let saved = repo
        .save_note(ConnectionNote {
          connection_id,
          title:         text.title.unwrap_or_default(),
          message:       text.message.unwrap_or_default(),
        })
        .await?;
      print_json(&ConnectionNoteDetails::from(saved))
    }
    NotesCommand::Update { note_id, text } => {
      let mut note = repo
        .find_note(&note_id)
        .await?
        .ok_or_else(|| wallet_agent::Error::ConnectionNoteNotFound(note_id.clone()))?;
      if let Some(title) = text.title {
        note.content.title = title;
      }
      if let Some(message) = text.message {
        note.content.message = message;
      }
      let updated = repo.update_note(&note).await?;
      print_json(&ConnectionNoteDetails::from(updated))
    }
    NotesCommand::Delete { note_id } => Ok(repo.delete_note(&note_id).await?),
  }
}

async fn records(store: &SqliteStore, cmd: RecordsCommand) -> Result<()> {
  match cmd {
    RecordsCommand::Get { id } => {
      let record = store
        .find_by_id(&id)
        .await?
        .ok_or(wallet_core::Error::RecordNotFound(id))?;
      print_json(&record)
    }
    RecordsCommand::Query { record_type, query } => {
      let query = match query {
        Some(raw) => {
          let value: Value = serde_json::from_str(&raw).context("query is not valid JSON")?;
          Query::from_json(&value)?
        }
        None => Query::all(),
      };
      let found = store.find_all_by_query(record_type, &query).await?;
      print_json(&found)
    }
  }
}

async fn prefs(store: &SqliteStore, cmd: PrefsCommand) -> Result<()> {
  match cmd {
    PrefsCommand::Get { key } => print_json(&store.get_preference(&key).await?),
    PrefsCommand::Set { key, value } => {
      let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
      store.set_preference(&key, value).await?;
      Ok(())
    }
    PrefsCommand::Remove { key } => Ok(store.remove_preference(&key).await?),
  }
}
