//! [`NotificationService`]: projects agent notifications into local records.
//!
//! Only notifications on a known [`NotificationRoute`] are kept. Anything
//! else is marked read on the agent and dropped.

use std::sync::Arc;

use chrono::Utc;
use wallet_core::{
  ErrorKind,
  agent::{IdentityAgent, Notification},
  record::{RecordContent as _, TypedRecord},
  records::{KeriNotification, KeriNotificationRecord},
  store::RecordStore,
};

use crate::{
  Error, Result,
  error::{agent_err, store_err},
};

/// Notification routes the wallet acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum NotificationRoute {
  /// A group member asks us to join a multisig inception.
  #[strum(serialize = "/multisig/icp")]
  MultiSigIcp,
  /// An issuer offers a credential over IPEX.
  #[strum(serialize = "/exn/ipex/grant")]
  ExnIpexGrant,
}

impl NotificationRoute {
  /// `None` for routes the wallet does not handle.
  pub fn classify(route: &str) -> Option<Self> { route.parse().ok() }
}

pub struct NotificationService<S, A> {
  store: Arc<S>,
  agent: Arc<A>,
}

impl<S, A> NotificationService<S, A>
where
  S: RecordStore,
  A: IdentityAgent,
{
  pub fn new(store: Arc<S>, agent: Arc<A>) -> Self { Self { store, agent } }

  /// Classify one notification. A recognised one is persisted and `callback`
  /// is invoked once with the stored record, which is also returned. An
  /// unrecognised one is marked read on the agent; the callback is not
  /// invoked and `None` is returned.
  pub async fn process_notification<F>(
    &self,
    notification: &Notification,
    callback: F,
  ) -> Result<Option<KeriNotificationRecord>>
  where
    F: FnOnce(&KeriNotificationRecord) + Send,
  {
    let route = &notification.attributes.route;
    if NotificationRoute::classify(route).is_none() {
      tracing::warn!(id = %notification.id, route = %route, "dropping notification with unknown route");
      self
        .agent
        .mark_notification(&notification.id)
        .await
        .map_err(agent_err)?;
      return Ok(None);
    }

    let content = KeriNotification {
      route:   route.clone(),
      digest:  notification.attributes.digest.clone(),
      read_at: None,
    };
    let record = self
      .store
      .save(content.to_new_record(None)?)
      .await
      .map_err(store_err)?;
    let projected = TypedRecord::from_record(record)?;

    callback(&projected);
    Ok(Some(projected))
  }

  /// Process a batch in order, stopping at the first error.
  pub async fn process_notifications<F>(
    &self,
    notifications: &[Notification],
    mut callback: F,
  ) -> Result<Vec<KeriNotificationRecord>>
  where
    F: FnMut(&KeriNotificationRecord) + Send,
  {
    let mut projected = Vec::new();
    for notification in notifications {
      if let Some(record) = self.process_notification(notification, &mut callback).await? {
        projected.push(record);
      }
    }
    Ok(projected)
  }

  /// Every projected notification, oldest first.
  pub async fn get_notifications(&self) -> Result<Vec<KeriNotificationRecord>> {
    let records = self
      .store
      .get_all(KeriNotification::RECORD_TYPE)
      .await
      .map_err(store_err)?;
    let mut notifications = records
      .into_iter()
      .map(|r| TypedRecord::from_record(r).map_err(Error::from))
      .collect::<Result<Vec<KeriNotificationRecord>>>()?;
    notifications.sort_by_key(|n| n.created_at);
    Ok(notifications)
  }

  /// Stamp `read_at` on a projected notification.
  pub async fn mark_notification_read(&self, id: &str) -> Result<KeriNotificationRecord> {
    let record = self
      .store
      .find_by_id(id)
      .await
      .map_err(store_err)?
      .filter(|r| r.record_type == KeriNotification::RECORD_TYPE)
      .ok_or_else(|| Error::NotificationNotFound(id.to_owned()))?;

    let mut notification = KeriNotificationRecord::from_record(record)?;
    notification.content.read_at = Some(Utc::now());

    match self.store.update(notification.to_record()?).await {
      Ok(updated) => Ok(TypedRecord::from_record(updated)?),
      Err(e) => {
        let e: wallet_core::Error = e.into();
        if e.kind() == ErrorKind::NotFound {
          return Err(Error::NotificationNotFound(id.to_owned()));
        }
        Err(Error::Store(e))
      }
    }
  }

  /// Delete a projected notification; an absent id, or one naming another
  /// record type, is a no-op.
  pub async fn delete_notification_by_id(&self, id: &str) -> Result<()> {
    let found = self
      .store
      .find_by_id(id)
      .await
      .map_err(store_err)?
      .filter(|r| r.record_type == KeriNotification::RECORD_TYPE);
    if let Some(record) = found {
      self.store.delete_by_id(&record.id).await.map_err(store_err)?;
    }
    Ok(())
  }
}
