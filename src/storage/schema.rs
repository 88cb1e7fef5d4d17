//! Database schema definitions
//!
//! The table name comes from configuration, so every statement is built
//! from a [`TableName`] that has already been validated as a plain SQL
//! identifier.

use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Default table name when configuration does not supply one
pub const DEFAULT_TABLE: &str = "preferences";

/// Width of the `key` column
pub const MAX_KEY_LENGTH: usize = 255;

/// Width of the `value` column
pub const MAX_VALUE_LENGTH: usize = 8000;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier() -> &'static Regex {
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex"))
}

/// A table name that is safe to interpolate into SQL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !identifier().is_match(&name) {
            return Err(Error::InvalidTableName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier for use in statements
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    pub fn index_name(&self) -> String {
        format!("\"idx_{}_node\"", self.0)
    }

    fn check_name(&self) -> String {
        format!("\"chk_{}_key_value\"", self.0)
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SQL to create the preferences table.
///
/// The check constraint encodes the sentinel invariant: the row with an
/// empty key marks node existence and never carries a value.
pub fn create_table(table: &TableName) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    "node" VARCHAR(255) NOT NULL,
    "key" VARCHAR(255) NOT NULL,
    "value" VARCHAR(8000),
    PRIMARY KEY ("node", "key"),
    CONSTRAINT {check} CHECK ("key" <> '' OR "value" IS NULL)
)
"#,
        table = table.quoted(),
        check = table.check_name(),
    )
}

/// SQL to create the index on the `node` column
pub fn create_node_index(table: &TableName) -> String {
    format!(
        r#"CREATE INDEX IF NOT EXISTS {index} ON {table} ("node")"#,
        index = table.index_name(),
        table = table.quoted(),
    )
}

/// All schema creation statements, in execution order
pub fn all_schema_statements(table: &TableName) -> Vec<String> {
    vec![create_table(table), create_node_index(table)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(TableName::new("preferences").is_ok());
        assert!(TableName::new("_prefs_2").is_ok());
        assert!(matches!(TableName::new(""), Err(Error::InvalidTableName(_))));
        assert!(TableName::new("2prefs").is_err());
        assert!(TableName::new("prefs; DROP TABLE x").is_err());
        assert!(TableName::new("pre\"fs").is_err());
        assert!(TableName::new("a".repeat(64)).is_err());
    }

    #[test]
    fn test_statements_use_quoted_names() {
        let table = TableName::new("user_prefs").unwrap();
        let stmts = all_schema_statements(&table);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("CREATE TABLE IF NOT EXISTS \"user_prefs\""));
        assert!(stmts[0].contains("\"chk_user_prefs_key_value\""));
        assert!(stmts[1].contains("\"idx_user_prefs_node\""));
    }
}
