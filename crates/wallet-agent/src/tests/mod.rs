//! Service tests against an in-memory SQLite store and a scripted agent.

mod connections;

use std::sync::Arc;

use wallet_store_sqlite::SqliteStore;

use crate::AgentConfig;

async fn store() -> Arc<SqliteStore> {
  Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

/// Fast polling so resolution tests run in milliseconds.
fn config() -> AgentConfig {
  AgentConfig {
    oobi_poll_interval_ms: 1,
    oobi_resolve_timeout_ms: 50,
    ..AgentConfig::default()
  }
}
