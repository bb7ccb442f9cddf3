//! Connection and notification services for the wallet.
//!
//! Orchestrates the identity agent ([`wallet_core::agent::IdentityAgent`])
//! and the local record store ([`wallet_core::store::RecordStore`]):
//!
//! - [`repository::ConnectionRepository`]: typed access to connection,
//!   note and credential-metadata records.
//! - [`connections::ConnectionService`]: OOBI resolution, contact sync and
//!   connection state events.
//! - [`notifications::NotificationService`]: projection of agent
//!   notifications into local records.

pub mod config;
pub mod connections;
pub mod error;
pub mod events;
pub mod notifications;
pub mod oobi;
pub mod repository;

pub use config::AgentConfig;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
