//! SQLite persistence for historical yield records.
//!
//! Wraps [`tokio_rusqlite`] so database access runs on a dedicated thread
//! without blocking the async runtime. The engine itself never touches the
//! database; callers load records once and build a benchmark store from
//! them.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{ImportBatch, SqliteStore};

#[cfg(test)]
mod tests;
