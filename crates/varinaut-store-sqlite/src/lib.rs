//! SQLite backend for the Varinaut prediction store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The schema is owned by the
//! [`migrations`] chain.

mod encode;
mod session;
mod store;

pub mod error;
pub mod migrations;

pub use error::{Error, Result};
pub use migrations::{MigrationStatus, Target};
pub use session::Session;
pub use store::{SqliteStore, StoreLocation};

#[cfg(test)]
mod tests;
