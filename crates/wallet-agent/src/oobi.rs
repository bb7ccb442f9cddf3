//! OOBI resolution with memoisation and in-flight deduplication.
//!
//! A URL is resolved against the agent at most once per [`OobiResolver`]:
//! the first successful result is cached for the resolver's lifetime, and
//! concurrent requests for a URL that is still resolving wait on the same
//! attempt. A failed attempt is not cached; the next request retries.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use serde::Serialize;
use tokio::{sync::OnceCell, time::Instant};
use url::Url;
use uuid::Uuid;
use wallet_core::agent::{IdentityAgent, Operation};

use crate::{
  AgentConfig, Error, Result,
  error::agent_err,
};

/// A completed resolution: the agent's finished operation plus the alias the
/// OOBI was resolved under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOobi {
  pub operation: Operation,
  pub alias:     String,
}

impl ResolvedOobi {
  /// The remote identifier (`response.i`) the OOBI resolved to.
  pub fn identifier(&self) -> Option<&str> {
    self.operation.response.as_ref()?.get("i")?.as_str()
  }
}

/// The alias to resolve `url` under: its `name` query parameter, or a fresh
/// random id when there is none.
pub fn alias_from_url(url: &str) -> Result<String> {
  let parsed = Url::parse(url).map_err(|source| Error::InvalidOobiUrl {
    url: url.to_owned(),
    source,
  })?;
  let alias = parsed
    .query_pairs()
    .find(|(k, _)| k == "name")
    .map(|(_, v)| v.into_owned())
    .unwrap_or_else(|| Uuid::new_v4().to_string());
  Ok(alias)
}

/// Poll `operation` until it reports `done` or `timeout` elapses. Returns the
/// last state seen, which is still not done if the budget ran out.
pub async fn wait_for_operation<A: IdentityAgent>(
  agent: &A,
  mut operation: Operation,
  interval: Duration,
  timeout: Duration,
) -> Result<Operation> {
  let deadline = Instant::now() + timeout;
  while !operation.done {
    let now = Instant::now();
    if now >= deadline {
      break;
    }
    tokio::time::sleep(interval.min(deadline - now)).await;
    operation = agent
      .get_operation(&operation.name)
      .await
      .map_err(agent_err)?;
  }
  Ok(operation)
}

pub struct OobiResolver {
  poll_interval: Duration,
  timeout:       Duration,
  entries:       Mutex<HashMap<String, Arc<OnceCell<ResolvedOobi>>>>,
}

impl OobiResolver {
  pub fn new(config: &AgentConfig) -> Self {
    Self {
      poll_interval: config.poll_interval(),
      timeout:       config.resolve_timeout(),
      entries:       Mutex::new(HashMap::new()),
    }
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<OnceCell<ResolvedOobi>>>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// The cell for `url`, created on first use.
  fn entry(&self, url: &str) -> Arc<OnceCell<ResolvedOobi>> {
    Arc::clone(self.lock().entry(url.to_owned()).or_default())
  }

  /// Drop the cell for `url` after a failed attempt, unless it has since
  /// resolved or another caller is still waiting on it.
  fn forget_failed(&self, url: &str, cell: &Arc<OnceCell<ResolvedOobi>>) {
    let mut entries = self.lock();
    let idle = entries
      .get(url)
      .is_some_and(|held| Arc::ptr_eq(held, cell) && Arc::strong_count(cell) == 2);
    if idle && !cell.initialized() {
      entries.remove(url);
    }
  }

  /// The cached result for `url`, if it has already resolved.
  pub fn cached(&self, url: &str) -> Option<ResolvedOobi> {
    self.lock().get(url).and_then(|cell| cell.get().cloned())
  }

  /// Resolve `url`, reusing a cached or in-flight result when there is one.
  pub async fn resolve<A: IdentityAgent>(&self, agent: &A, url: &str) -> Result<ResolvedOobi> {
    let cell = self.entry(url);
    if let Some(hit) = cell.get() {
      tracing::debug!(url, "OOBI already resolved");
      return Ok(hit.clone());
    }
    match cell.get_or_try_init(|| self.resolve_uncached(agent, url)).await {
      Ok(resolved) => Ok(resolved.clone()),
      Err(e) => {
        self.forget_failed(url, &cell);
        Err(e)
      }
    }
  }

  async fn resolve_uncached<A: IdentityAgent>(
    &self,
    agent: &A,
    url: &str,
  ) -> Result<ResolvedOobi> {
    let alias = alias_from_url(url)?;
    tracing::debug!(url, alias = %alias, "resolving OOBI");

    let started = agent.resolve_oobi(url, &alias).await.map_err(agent_err)?;
    let operation =
      wait_for_operation(agent, started, self.poll_interval, self.timeout).await?;

    if !operation.done {
      return Err(Error::OobiResolutionTimedOut {
        url:    url.to_owned(),
        waited: self.timeout,
      });
    }
    if let Some(error) = &operation.error {
      return Err(Error::OobiResolutionFailed {
        url:    url.to_owned(),
        reason: error.to_string(),
      });
    }

    let resolved = ResolvedOobi { operation, alias };
    if resolved.identifier().is_none() {
      return Err(Error::OobiResolutionFailed {
        url:    url.to_owned(),
        reason: "operation response carries no identifier".to_owned(),
      });
    }
    Ok(resolved)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tests::fake::{FakeAgent, Outcome};

  const URL: &str = "http://keria:3902/oobi/EBob?name=Bob";

  fn resolver() -> OobiResolver {
    OobiResolver::new(&AgentConfig {
      oobi_poll_interval_ms: 1,
      oobi_resolve_timeout_ms: 20,
      ..AgentConfig::default()
    })
  }

  fn tracked(resolver: &OobiResolver) -> usize { resolver.lock().len() }

  #[tokio::test]
  async fn cache_lookup_does_not_track_url() {
    let resolver = resolver();
    assert!(resolver.cached(URL).is_none());
    assert!(resolver.cached("http://keria:3902/oobi/EOther").is_none());
    assert_eq!(tracked(&resolver), 0);

    let agent = FakeAgent::default().with_outcome(URL, Outcome::Immediate("EBob".into()));
    resolver.resolve(&agent, URL).await.unwrap();
    assert_eq!(resolver.cached(URL).unwrap().identifier(), Some("EBob"));
    assert_eq!(tracked(&resolver), 1);
  }

  #[tokio::test]
  async fn failed_resolution_leaves_no_entry() {
    let resolver = resolver();
    let failing = FakeAgent::default().with_outcome(URL, Outcome::Fails("down".into()));
    assert!(resolver.resolve(&failing, URL).await.is_err());

    let pending = FakeAgent::default().with_outcome(URL, Outcome::Pending);
    assert!(resolver.resolve(&pending, URL).await.is_err());

    assert!(resolver.cached(URL).is_none());
    assert_eq!(tracked(&resolver), 0);
  }

  #[test]
  fn alias_comes_from_name_parameter() {
    let alias = alias_from_url("http://keria:3902/oobi/EAbc/agent/EDef?name=Alice%20B").unwrap();
    assert_eq!(alias, "Alice B");
  }

  #[test]
  fn alias_is_generated_without_name() {
    let a = alias_from_url("http://keria:3902/oobi/EAbc").unwrap();
    let b = alias_from_url("http://keria:3902/oobi/EAbc").unwrap();
    assert!(Uuid::parse_str(&a).is_ok());
    assert_ne!(a, b);
  }

  #[test]
  fn malformed_url_is_invalid() {
    let err = alias_from_url("not a url").unwrap_err();
    assert_eq!(err.kind(), wallet_core::ErrorKind::Invalid);
  }
}
