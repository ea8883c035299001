//! PostgreSQL store
//!
//! Production persistence backend: a pooled client plus the [`Store`]
//! implementation on top of it.
//!
//! [`Store`]: crate::store::Store

pub mod client;
pub mod store;

pub use client::PostgresClient;
pub use store::PostgresStore;
