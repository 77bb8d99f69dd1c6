//! SQLite persistence for channels
//!
//! Channel attributes are stored as a JSON document; memberships live in a
//! join table so identity lookups stay indexed.

pub mod migrations;
pub mod sql_store;

pub use migrations::{migrate, CURRENT_CHANNEL_SCHEMA_VERSION};
pub use sql_store::SqliteChannelStore;
