//! Storage Layer - SQLite-backed persistence
//!
//! The whole tree lives in one table:
//! - preferences(node, key, value)
//!
//! Each node owns one sentinel row with an empty key and NULL value that
//! records its existence; every other row is a real key.

pub mod schema;
pub mod sqlite;

pub use schema::{TableName, DEFAULT_TABLE, MAX_KEY_LENGTH, MAX_VALUE_LENGTH};
pub use sqlite::{Location, NodeStore, StoreStats, DEFAULT_BUSY_TIMEOUT};
