//! SQLite backend for the coursetag store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Multi-step writes, cross-period
//! replication included, run inside one `rusqlite` transaction on that thread.

mod encode;
mod schema;
mod store;
mod unit_of_work;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
