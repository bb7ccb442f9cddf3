//! Core types and trait definitions for the wallet's local state.
//!
//! No database or network code lives here. Storage backends implement
//! [`store::RecordStore`]; the identity agent is consumed through
//! [`agent::IdentityAgent`].

// Trait methods spell out `impl Future + Send`; implementors write `async fn`.
#![allow(async_fn_in_trait)]

pub mod agent;
pub mod error;
pub mod query;
pub mod record;
pub mod records;
pub mod store;
pub mod tag;

pub use error::{Error, ErrorKind, Result};
