//! # parley-store
//!
//! Local persistence for the Parley client, backed by SQLite.
//!
//! State is kept as named JSON snapshot slots (one for the session, one for
//! the conversations) that are overwritten wholesale after every mutation and
//! read back on start.  The crate exposes a synchronous `Database` handle that
//! wraps a `rusqlite::Connection`, plus the domain models stored in those
//! snapshots.

pub mod database;
pub mod migrations;
pub mod models;
pub mod slots;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
