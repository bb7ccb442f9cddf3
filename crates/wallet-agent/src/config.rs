//! Runtime configuration for the agent-facing services.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for [`crate::connections::ConnectionService`]. Every field has a
/// default, so an empty `[agent]` table is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
  /// Endpoint role requested when fetching our own OOBIs.
  pub default_role:            String,
  /// Delay between polls of a long-running agent operation.
  pub oobi_poll_interval_ms:   u64,
  /// Upper bound on how long an OOBI resolution is polled before giving up.
  pub oobi_resolve_timeout_ms: u64,
}

impl Default for AgentConfig {
  fn default() -> Self {
    Self {
      default_role:            "agent".to_owned(),
      oobi_poll_interval_ms:   250,
      oobi_resolve_timeout_ms: 60_000,
    }
  }
}

impl AgentConfig {
  pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.oobi_poll_interval_ms) }

  pub fn resolve_timeout(&self) -> Duration {
    Duration::from_millis(self.oobi_resolve_timeout_ms)
  }
}
