use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use wallet_core::{
  ErrorKind,
  records::{ConnectionMetadata, CredentialMetadata},
};
use wallet_store_sqlite::SqliteStore;

use super::{
  config,
  fake::{FakeAgent, Outcome},
  store,
};
use crate::{
  connections::{ConnectionHistoryType, ConnectionNoteProps, ConnectionService},
  events::{ConnectionStateChanged, ConnectionStatus},
};

const URL: &str = "http://keria:3902/oobi/EBob/agent/EAgent?name=Bob";

async fn service(agent: FakeAgent) -> (ConnectionService<SqliteStore, FakeAgent>, Arc<FakeAgent>) {
  let agent = Arc::new(agent);
  let svc = ConnectionService::new(store().await, Arc::clone(&agent), config());
  (svc, agent)
}

fn record_events(
  svc: &ConnectionService<SqliteStore, FakeAgent>,
) -> Arc<Mutex<Vec<ConnectionStateChanged>>> {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = Arc::clone(&seen);
  let _sub = svc.on_connection_state_changed(move |e| sink.lock().unwrap().push(e.clone()));
  seen
}

fn props(title: &str, message: &str) -> ConnectionNoteProps {
  ConnectionNoteProps {
    title:   title.into(),
    message: message.into(),
  }
}

// ─── OOBI resolution ─────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_twice_contacts_agent_once() {
  let (svc, agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Immediate("EBob".into()))).await;

  let first = svc.resolve_oobi(URL).await.unwrap();
  let second = svc.resolve_oobi(URL).await.unwrap();

  assert_eq!(first, second);
  assert_eq!(first.alias, "Bob");
  assert_eq!(first.identifier(), Some("EBob"));
  assert_eq!(agent.resolve_calls(), 1);
}

#[tokio::test]
async fn concurrent_resolutions_share_one_agent_call() {
  let agent = FakeAgent {
    resolve_delay: Duration::from_millis(20),
    ..FakeAgent::default()
  }
  .with_outcome(URL, Outcome::Immediate("EBob".into()));
  let (svc, agent) = service(agent).await;

  let (a, b) = tokio::join!(svc.resolve_oobi(URL), svc.resolve_oobi(URL));
  assert_eq!(a.unwrap(), b.unwrap());
  assert_eq!(agent.resolve_calls(), 1);
}

#[tokio::test]
async fn resolution_completes_after_polling() {
  let (svc, agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::AfterPolls("EBob".into(), 3))).await;

  let resolved = svc.resolve_oobi(URL).await.unwrap();
  assert_eq!(resolved.identifier(), Some("EBob"));
  assert!(resolved.operation.done);
  assert_eq!(agent.poll_calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_resolution_is_not_cached() {
  let (svc, agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Fails("unreachable".into()))).await;

  let err = svc.resolve_oobi(URL).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::OobiResolutionFailed);

  agent
    .outcomes
    .lock()
    .unwrap()
    .insert(URL.into(), Outcome::Immediate("EBob".into()));
  let resolved = svc.resolve_oobi(URL).await.unwrap();
  assert_eq!(resolved.identifier(), Some("EBob"));
  assert_eq!(agent.resolve_calls(), 2);
}

#[tokio::test]
async fn resolution_that_never_completes_times_out() {
  let (svc, _agent) = service(FakeAgent::default().with_outcome(URL, Outcome::Pending)).await;

  let err = svc.resolve_oobi(URL).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::OobiResolutionFailed);
  assert!(matches!(err, crate::Error::OobiResolutionTimedOut { .. }));
}

// ─── Connecting ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_emits_pending_then_confirmed() {
  let (svc, _agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Immediate("EBob".into()))).await;
  let seen = record_events(&svc);

  let id = svc.connect_by_oobi_url(URL).await.unwrap();
  assert_eq!(id, "EBob");

  let events = seen.lock().unwrap().clone();
  assert_eq!(events, vec![
    ConnectionStateChanged {
      connection_id: None,
      status:        ConnectionStatus::Pending,
    },
    ConnectionStateChanged {
      connection_id: Some("EBob".into()),
      status:        ConnectionStatus::Confirmed,
    },
  ]);

  let stored = svc.repository().get_connection("EBob").await.unwrap();
  assert_eq!(stored.content.alias, "Bob");
  assert_eq!(stored.content.oobi, URL);
}

#[tokio::test]
async fn failed_connect_leaves_only_pending() {
  let (svc, _agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Fails("boom".into()))).await;
  let seen = record_events(&svc);

  let err = svc.connect_by_oobi_url(URL).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::OobiResolutionFailed);

  let events = seen.lock().unwrap().clone();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].status, ConnectionStatus::Pending);
  assert!(svc.get_connections().await.unwrap().is_empty());
}

#[tokio::test]
async fn panicking_listener_does_not_abort_connect() {
  let (svc, _agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Immediate("EBob".into()))).await;
  let _bad = svc.on_connection_state_changed(|_| panic!("listener failure"));
  let seen = record_events(&svc);

  svc.connect_by_oobi_url(URL).await.unwrap();
  assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn reconnecting_same_oobi_is_a_duplicate() {
  let (svc, agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Immediate("EBob".into()))).await;

  svc.connect_by_oobi_url(URL).await.unwrap();
  let err = svc.connect_by_oobi_url(URL).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DuplicateId);
  assert_eq!(agent.resolve_calls(), 1);
}

// ─── Sync ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_adds_missing_contacts_only() {
  let agent = FakeAgent::default()
    .with_contact("EA", "Alice", "http://keria/oobi/EA")
    .with_contact("EB", "Bob", "http://keria/oobi/EB");
  let (svc, _agent) = service(agent).await;

  let repo = svc.repository();
  repo
    .save_connection("EA", ConnectionMetadata {
      alias: "Alice (local)".into(),
      oobi:  "http://keria/oobi/EA".into(),
    })
    .await
    .unwrap();
  repo
    .save_connection("EL", ConnectionMetadata {
      alias: "Local only".into(),
      oobi:  "http://elsewhere/oobi/EL".into(),
    })
    .await
    .unwrap();

  let created = svc.sync_keria_contacts().await.unwrap();
  assert_eq!(created, ["EB"]);

  let b = repo.get_connection("EB").await.unwrap();
  assert_eq!(b.content.alias, "Bob");
  assert_eq!(b.content.oobi, "http://keria/oobi/EB");

  // Existing and local-only connections are untouched.
  assert_eq!(repo.get_connection("EA").await.unwrap().content.alias, "Alice (local)");
  assert!(repo.find_connection("EL").await.unwrap().is_some());

  assert!(svc.sync_keria_contacts().await.unwrap().is_empty());
  assert_eq!(svc.get_connections().await.unwrap().len(), 3);
}

#[tokio::test]
async fn concurrent_syncs_create_each_contact_once() {
  let agent = FakeAgent::default().with_contact("EB", "Bob", "http://keria/oobi/EB");
  let (svc, _agent) = service(agent).await;

  let (a, b) = tokio::join!(svc.sync_keria_contacts(), svc.sync_keria_contacts());
  assert_eq!(a.unwrap().len() + b.unwrap().len(), 1);
}

// ─── Details, notes, history ─────────────────────────────────────────────────

#[tokio::test]
async fn short_details_for_missing_connection_is_not_found() {
  let (svc, _agent) = service(FakeAgent::default()).await;
  let err = svc.get_connection_short_detail_by_id("EX").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn connection_details_join_agent_metadata_and_notes() {
  let agent = FakeAgent::default()
    .with_contact("EB", "Bob", "http://keria/oobi/EB")
    .with_outcome(URL, Outcome::Immediate("EB".into()));
  let (svc, _agent) = service(agent).await;

  svc.connect_by_oobi_url(URL).await.unwrap();
  svc.create_connection_note("EB", props("met", "at the conference")).await.unwrap();

  let details = svc.get_connection_by_id("EB").await.unwrap();
  assert_eq!(details.label, "Bob");
  assert_eq!(details.service_endpoints, ["http://keria/oobi/EB"]);
  assert_eq!(details.status, ConnectionStatus::Confirmed);
  assert_eq!(details.notes.len(), 1);
  assert_eq!(details.notes[0].title, "met");

  let short = svc.get_connection_short_detail_by_id("EB").await.unwrap();
  assert_eq!(short.connection_date, details.connection_date);
  assert_eq!(short.oobi, URL);
}

#[tokio::test]
async fn note_update_and_delete_semantics() {
  let (svc, _agent) = service(FakeAgent::default()).await;

  let note = svc.create_connection_note("EB", props("a", "b")).await.unwrap();
  let updated = svc
    .update_connection_note_by_id(&note.id, props("c", "d"))
    .await
    .unwrap();
  assert_eq!(updated.id, note.id);
  assert_eq!(updated.title, "c");

  let err = svc
    .update_connection_note_by_id("missing", props("x", "y"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  svc.delete_connection_note_by_id(&note.id).await.unwrap();
  svc.delete_connection_note_by_id(&note.id).await.unwrap();
  assert!(svc.repository().find_note(&note.id).await.unwrap().is_none());
}

#[tokio::test]
async fn note_operations_ignore_connection_ids() {
  let (svc, _agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Immediate("EB".into()))).await;
  svc.connect_by_oobi_url(URL).await.unwrap();

  svc.delete_connection_note_by_id("EB").await.unwrap();
  assert!(svc.repository().find_connection("EB").await.unwrap().is_some());

  let err = svc
    .update_connection_note_by_id("EB", props("x", "y"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let listed = svc.get_connections().await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].label, "Bob");
}

#[tokio::test]
async fn delete_connection_cascades_to_notes() {
  let (svc, _agent) =
    service(FakeAgent::default().with_outcome(URL, Outcome::Immediate("EB".into()))).await;

  svc.connect_by_oobi_url(URL).await.unwrap();
  for i in 0..3 {
    svc
      .create_connection_note("EB", props(&format!("n{i}"), ""))
      .await
      .unwrap();
  }
  let other = svc.create_connection_note("EOther", props("keep", "")).await.unwrap();

  let report = svc.delete_connection_by_id("EB").await.unwrap();
  assert_eq!(report.notes_deleted, 3);
  assert!(report.is_complete());

  let repo = svc.repository();
  assert!(repo.find_connection("EB").await.unwrap().is_none());
  assert!(repo.notes_for_connection("EB").await.unwrap().is_empty());
  assert!(repo.find_note(&other.id).await.unwrap().is_some());
}

#[tokio::test]
async fn history_lists_accepted_credentials_in_order() {
  let (svc, _agent) = service(FakeAgent::default()).await;
  let repo = svc.repository();

  for (id, kind) in [("cred-1", "Passport"), ("cred-2", "Residence")] {
    repo
      .save_credential_metadata(id, CredentialMetadata {
        connection_id:   "EB".into(),
        credential_type: kind.into(),
      })
      .await
      .unwrap();
  }
  repo
    .save_credential_metadata("cred-3", CredentialMetadata {
      connection_id:   "EOther".into(),
      credential_type: "Other".into(),
    })
    .await
    .unwrap();

  let history = svc.get_connection_history_by_id("EB").await.unwrap();
  assert_eq!(history.len(), 2);
  assert!(history.iter().all(|h| h.kind == ConnectionHistoryType::CredentialAccepted));
  assert!(history[0].timestamp <= history[1].timestamp);
  assert_eq!(history[0].credential_type, "Passport");
}

// ─── Our OOBI ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_oobi_appends_encoded_alias() {
  let agent = FakeAgent::default();
  agent
    .oobis
    .lock()
    .unwrap()
    .insert("wallet-aid".into(), vec!["http://keria/oobi/EMe/agent/EAgent".into()]);
  let (svc, _agent) = service(agent).await;

  let bare = svc.get_oobi("wallet-aid", None).await.unwrap();
  assert_eq!(bare, "http://keria/oobi/EMe/agent/EAgent");

  let named = svc.get_oobi("wallet-aid", Some("Alice Smith")).await.unwrap();
  assert_eq!(named, "http://keria/oobi/EMe/agent/EAgent?name=Alice%20Smith");
  assert_eq!(crate::oobi::alias_from_url(&named).unwrap(), "Alice Smith");

  let marks = svc.get_oobi("wallet-aid", Some("O'Neil & co.")).await.unwrap();
  assert!(marks.ends_with("?name=O'Neil%20%26%20co."));

  let err = svc.get_oobi("unknown", None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}
