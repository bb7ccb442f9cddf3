//! The identity agent boundary.
//!
//! The agent (a KERIA instance driven through a signify client) owns all
//! protocol and cryptographic work. The wallet core only calls the operations
//! below and maps their results onto local records.

use std::future::Future;

use serde::{Deserialize, Serialize};

// ─── Wire shapes ─────────────────────────────────────────────────────────────

/// A contact known to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub id:    String,
  pub alias: String,
  pub oobi:  String,
}

/// The OOBIs the agent publishes for one of its identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OobiList {
  #[serde(default)]
  pub role:  String,
  pub oobis: Vec<String>,
}

/// A long-running agent operation. Poll with
/// [`IdentityAgent::get_operation`] until `done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
  pub name:     String,
  #[serde(default)]
  pub done:     bool,
  #[serde(default)]
  pub error:    Option<serde_json::Value>,
  #[serde(default)]
  pub response: Option<serde_json::Value>,
}

impl Operation {
  /// Done without an error payload.
  pub fn succeeded(&self) -> bool { self.done && self.error.is_none() }
}

/// The attributes block of an agent notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAttributes {
  /// Route of the protocol message, e.g. `/multisig/icp`.
  #[serde(rename = "r")]
  pub route:  String,
  #[serde(rename = "d")]
  pub digest: String,
  #[serde(rename = "m", default)]
  pub extra:  String,
}

/// An inbound notification as delivered by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  #[serde(rename = "i")]
  pub id:         String,
  #[serde(rename = "dt")]
  pub datetime:   String,
  #[serde(rename = "r")]
  pub read:       bool,
  #[serde(rename = "a")]
  pub attributes: NotificationAttributes,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the identity agent client.
pub trait IdentityAgent: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get_contact<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + 'a;

  fn list_contacts(
    &self,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// OOBIs for the identifier named `name` in the given endpoint role.
  fn get_oobis<'a>(
    &'a self,
    name: &'a str,
    role: &'a str,
  ) -> impl Future<Output = Result<OobiList, Self::Error>> + Send + 'a;

  /// Start resolving `url` under `alias`.
  fn resolve_oobi<'a>(
    &'a self,
    url: &'a str,
    alias: &'a str,
  ) -> impl Future<Output = Result<Operation, Self::Error>> + Send + 'a;

  /// Current state of a long-running operation.
  fn get_operation<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Operation, Self::Error>> + Send + 'a;

  /// Mark a notification as read on the agent.
  fn mark_notification<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
