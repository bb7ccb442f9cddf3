//! Connection state events and their listener registry.
//!
//! Emission is synchronous: [`ConnectionEvents::emit`] calls every listener in
//! subscription order before returning. A panicking listener is logged and
//! skipped; it never aborts the emitting call.

use std::{
  panic::{AssertUnwindSafe, catch_unwind},
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use serde::{Deserialize, Serialize};

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
  Pending,
  Confirmed,
}

/// A connection moved between states. `connection_id` is `None` while the
/// remote identifier is not yet known (i.e. in the `Pending` event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStateChanged {
  pub connection_id: Option<String>,
  pub status:        ConnectionStatus,
}

// ─── Registry ────────────────────────────────────────────────────────────────

type Listener = Arc<dyn Fn(&ConnectionStateChanged) + Send + Sync>;

#[derive(Default)]
struct Registry {
  next_id:   u64,
  listeners: Vec<(u64, Listener)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
  registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fan-out point for [`ConnectionStateChanged`] events.
///
/// Cloning is cheap and clones share listeners.
#[derive(Clone, Default)]
pub struct ConnectionEvents {
  registry: Arc<Mutex<Registry>>,
}

impl ConnectionEvents {
  pub fn new() -> Self { Self::default() }

  /// Register a listener. It stays registered until
  /// [`Subscription::unsubscribe`] is called; dropping the handle does not
  /// remove it.
  pub fn subscribe<F>(&self, listener: F) -> Subscription
  where
    F: Fn(&ConnectionStateChanged) + Send + Sync + 'static,
  {
    let mut registry = lock(&self.registry);
    let id = registry.next_id;
    registry.next_id += 1;
    registry.listeners.push((id, Arc::new(listener)));
    Subscription {
      id,
      registry: Arc::downgrade(&self.registry),
    }
  }

  /// Deliver `event` to every current listener.
  pub fn emit(&self, event: &ConnectionStateChanged) {
    // Snapshot so listeners may (un)subscribe while being called.
    let listeners: Vec<Listener> = lock(&self.registry)
      .listeners
      .iter()
      .map(|(_, l)| Arc::clone(l))
      .collect();

    for listener in listeners {
      if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
        tracing::warn!(?event, "connection state listener panicked");
      }
    }
  }

  pub fn listener_count(&self) -> usize { lock(&self.registry).listeners.len() }
}

/// Handle returned by [`ConnectionEvents::subscribe`].
pub struct Subscription {
  id:       u64,
  registry: Weak<Mutex<Registry>>,
}

impl Subscription {
  /// Remove the listener. A no-op once the emitter itself is gone.
  pub fn unsubscribe(self) {
    if let Some(registry) = self.registry.upgrade() {
      lock(&registry).listeners.retain(|(id, _)| *id != self.id);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  fn pending() -> ConnectionStateChanged {
    ConnectionStateChanged {
      connection_id: None,
      status:        ConnectionStatus::Pending,
    }
  }

  #[test]
  fn unsubscribe_stops_delivery() {
    let events = ConnectionEvents::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    let sub = events.subscribe(move |_| {
      h.fetch_add(1, Ordering::SeqCst);
    });

    events.emit(&pending());
    sub.unsubscribe();
    events.emit(&pending());

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(events.listener_count(), 0);
  }

  #[test]
  fn panicking_listener_does_not_block_others() {
    let events = ConnectionEvents::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let _bad = events.subscribe(|_| panic!("listener failure"));
    let h = Arc::clone(&hits);
    let _good = events.subscribe(move |_| {
      h.fetch_add(1, Ordering::SeqCst);
    });

    events.emit(&pending());
    events.emit(&pending());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }
}
