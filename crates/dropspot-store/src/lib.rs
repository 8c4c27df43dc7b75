//! # dropspot-store
//!
//! SQLite persistence for drops, waitlist entries and claims.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model, plus [`Database::transaction`] which runs a closure inside an
//! immediate (write-locking) transaction. Deciding *what* to read and write
//! inside a transaction is the engine's job; this crate only guarantees that
//! it commits or rolls back as one unit.

pub mod claims;
pub mod codec;
pub mod database;
pub mod drops;
pub mod migrations;
pub mod models;
pub mod users;
pub mod waitlist;

mod error;
#[cfg(test)]
mod test_utils;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
