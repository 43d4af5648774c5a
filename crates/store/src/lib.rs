//! Message log backends for banter.
//!
//! Two interchangeable implementations of the append-only
//! [`MessageLog`](banter_core::MessageLog) contract:
//! - [`InMemoryLog`] — process-lifetime history, for ephemeral sessions
//!   and tests
//! - [`SqliteLog`] — durable history in a single SQLite file
//!
//! Adapters pick one via configuration; the session engine never knows
//! which it is talking to.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryLog;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLog;
