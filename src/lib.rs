//! # nodeprefs - hierarchical preferences in a single SQL table
//!
//! A tree of preference nodes, each holding string keys and values,
//! persisted as flat `(node, key, value)` rows in one SQLite table.
//!
//! nodeprefs provides:
//! - Path encoding of nodes into the `node` column, with child and subtree
//!   relationships derived from LIKE patterns
//! - A per-operation-connection store over that table
//! - A tree-of-nodes API with an explicit path -> node registry
//! - User and system scopes resolved from a TOML file and the environment
//! - Export and import of whole subtrees as JSON documents

pub mod path;
pub mod storage;
pub mod tree;
pub mod scope;
pub mod config;
pub mod factory;
pub mod document;
pub mod output;
pub mod ui;


// Re-exports for convenient access
pub use path::NodePath;
pub use scope::Scope;
pub use storage::{NodeStore, TableName};
pub use tree::{Node, PreferencesTree};
pub use factory::PreferencesFactory;
pub use document::{Document, DocumentNode};

/// Result type alias for nodeprefs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for nodeprefs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Backing store unavailable: {0}")]
    BackingStore(String),

    #[error("Malformed path: {0}")]
    MalformedPath(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Node has been removed: {0}")]
    NodeRemoved(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of looking up a key.
///
/// A key stored with a NULL value is present; it is not the same as a key
/// that was never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// No row for this key
    Absent,
    /// The key exists and holds NULL
    Null,
    /// The key exists with a value
    Value(String),
}

impl Lookup {
    /// The stored value, collapsing NULL and absent to `None`
    pub fn into_value(self) -> Option<String> {
        match self {
            Lookup::Value(value) => Some(value),
            Lookup::Null | Lookup::Absent => None,
        }
    }

    /// Whether a row exists for the key, NULL or not
    pub fn is_present(&self) -> bool {
        !matches!(self, Lookup::Absent)
    }
}
