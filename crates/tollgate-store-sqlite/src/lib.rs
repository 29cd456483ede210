//! SQLite backend for the Tollgate ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-step mutation (purchase
//! completion, earnings release, view metering) executes inside a single
//! rusqlite transaction; the database is the sole synchronization point.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
