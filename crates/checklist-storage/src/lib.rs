//! Checklist Storage Layer
//!
//! SQLite-backed engine for inspection records and their photos.
//! Multi-record writes go through a single transaction and are all-or-nothing.

mod database;
mod error;
mod schema;

pub use database::{Database, StorageLocation};
pub use error::StorageError;
pub use schema::{ensure_schema, SCHEMA_VERSION};

pub type Result<T> = std::result::Result<T, StorageError>;
