//! SQLite storage implementation
//!
//! Every public operation opens its own connection, runs its statements and
//! drops the connection before returning. Nothing is cached between calls.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use crate::{Error, Lookup, Result};
use crate::path::NodePath;
use super::schema::{self, TableName};

/// Default time a connection waits on a locked database file
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A database file on disk
    File(PathBuf),
    /// A named shared-cache in-memory database (URI form)
    Memory(String),
}

/// SQLite-backed store for the flattened node tree
pub struct NodeStore {
    location: Location,
    table: TableName,
    busy_timeout: Duration,
    // Holds a shared in-memory database open between per-operation connections.
    _anchor: Option<Mutex<Connection>>,
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore")
            .field("location", &self.location)
            .field("table", &self.table)
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

impl NodeStore {
    /// Open a database file (creates if doesn't exist), ensure the table
    /// exists and the root node is present
    pub fn open(path: &Path, table: TableName) -> Result<Self> {
        Self::open_with_timeout(path, table, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`NodeStore::open`] with an explicit busy timeout
    pub fn open_with_timeout(path: &Path, table: TableName, busy_timeout: Duration) -> Result<Self> {
        let store = Self {
            location: Location::File(path.to_path_buf()),
            table,
            busy_timeout,
            _anchor: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open a private in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_table(TableName::default())
    }

    /// Open a private in-memory database using a specific table name
    pub fn open_in_memory_with_table(table: TableName) -> Result<Self> {
        let id = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:nodeprefs-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            id
        );
        let mut store = Self {
            location: Location::Memory(uri),
            table,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            _anchor: None,
        };
        store._anchor = Some(Mutex::new(store.connect()?));
        store.initialize()?;
        Ok(store)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    fn initialize(&self) -> Result<()> {
        self.ensure_schema()?;
        self.create_node(&NodePath::root())
    }

    /// Acquire a fresh connection for one logical operation
    fn connect(&self) -> Result<Connection> {
        let conn = match &self.location {
            Location::File(path) => Connection::open(path)?,
            Location::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        conn.busy_timeout(self.busy_timeout)?;
        // Paths are case-sensitive; LIKE must not fold `A/%` onto `a/...`.
        conn.execute_batch("PRAGMA case_sensitive_like = ON")?;
        Ok(conn)
    }

    // ========== Schema ==========

    /// Create the table and its node index if absent.
    ///
    /// Every statement is `IF NOT EXISTS`, so losing a creation race to
    /// another process is not an error.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        for stmt in schema::all_schema_statements(&self.table) {
            conn.execute(&stmt, [])?;
        }
        tracing::debug!(table = %self.table, "schema ready");
        Ok(())
    }

    // ========== Node Operations ==========

    /// Insert the sentinel rows for `path` and its ancestors unless already there
    pub fn create_node(&self, path: &NodePath) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_sentinels(&tx, &self.table, path)?;
        tx.commit()?;
        Ok(())
    }

    /// Whether the sentinel row for `path` exists
    pub fn node_exists(&self, path: &NodePath) -> Result<bool> {
        Ok(self.count_rows(path, "")? > 0)
    }

    /// Names of the nodes exactly one level below `path`, sorted
    pub fn list_immediate_children(&self, path: &NodePath) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let (like, not_like) = path.immediate_child_pattern();
        let mut stmt = conn.prepare(&format!(
            r#"SELECT DISTINCT "node" FROM {}
               WHERE "key" = '' AND "node" <> ?1
                 AND "node" LIKE ?2 ESCAPE '\' AND "node" NOT LIKE ?3 ESCAPE '\'
               ORDER BY "node""#,
            self.table.quoted()
        ))?;

        let nodes = stmt
            .query_map(params![path.encode(), like, not_like], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        nodes.iter().map(|node| path.decode_child(node)).collect()
    }

    /// Delete `path` and every descendant, returning the number of rows removed.
    ///
    /// Removing the root empties the table and recreates the root node.
    pub fn remove_subtree(&self, path: &NodePath) -> Result<usize> {
        let mut conn = self.connect()?;

        let removed = if path.is_root() {
            let tx = conn.transaction()?;
            let removed = tx.execute(&format!("DELETE FROM {}", self.table.quoted()), [])?;
            tx.execute(
                &format!(
                    r#"INSERT INTO {} ("node", "key", "value") VALUES ('', '', NULL)"#,
                    self.table.quoted()
                ),
                [],
            )?;
            tx.commit()?;
            removed
        } else {
            conn.execute(
                &format!(
                    r#"DELETE FROM {} WHERE "node" = ?1 OR "node" LIKE ?2 ESCAPE '\'"#,
                    self.table.quoted()
                ),
                params![path.encode(), path.subtree_pattern()],
            )?
        };

        tracing::debug!(node = %path, rows = removed, "removed subtree");
        Ok(removed)
    }

    // ========== Key Operations ==========

    /// Look up `key` at `path`
    pub fn get(&self, path: &NodePath, key: &str) -> Result<Lookup> {
        check_key(key)?;
        let conn = self.connect()?;
        let value: Option<Option<String>> = conn
            .query_row(
                &format!(
                    r#"SELECT "value" FROM {} WHERE "node" = ?1 AND "key" = ?2"#,
                    self.table.quoted()
                ),
                params![path.encode(), key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match value {
            None => Lookup::Absent,
            Some(None) => Lookup::Null,
            Some(Some(value)) => Lookup::Value(value),
        })
    }

    /// Insert `key`, or update its value in place if it already exists.
    ///
    /// The node's sentinel rows are written in the same transaction, so a key
    /// row never exists under a node that does not.
    pub fn put(&self, path: &NodePath, key: &str, value: Option<&str>) -> Result<()> {
        check_key(key)?;
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_sentinels(&tx, &self.table, path)?;
        tx.execute(
            &format!(
                r#"INSERT INTO {} ("node", "key", "value") VALUES (?1, ?2, ?3)
                   ON CONFLICT ("node", "key") DO UPDATE SET "value" = excluded."value""#,
                self.table.quoted()
            ),
            params![path.encode(), key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Delete `key`; returns whether a row was removed
    pub fn remove(&self, path: &NodePath, key: &str) -> Result<bool> {
        check_key(key)?;
        let conn = self.connect()?;
        let removed = conn.execute(
            &format!(
                r#"DELETE FROM {} WHERE "node" = ?1 AND "key" = ?2"#,
                self.table.quoted()
            ),
            params![path.encode(), key],
        )?;
        Ok(removed > 0)
    }

    /// Keys stored at `path`, sorted, without the sentinel
    pub fn list_keys(&self, path: &NodePath) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            r#"SELECT "key" FROM {} WHERE "node" = ?1 AND "key" <> '' ORDER BY "key""#,
            self.table.quoted()
        ))?;

        let keys = stmt
            .query_map([path.encode()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(keys.into_iter().filter(|k| !k.trim().is_empty()).collect())
    }

    /// Delete every key at `path`, keeping the node itself
    pub fn clear_keys(&self, path: &NodePath) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn.execute(
            &format!(
                r#"DELETE FROM {} WHERE "node" = ?1 AND "key" <> ''"#,
                self.table.quoted()
            ),
            [path.encode()],
        )?;
        Ok(removed)
    }

    /// Number of rows for `(path, key)`; at most one while the primary key holds
    pub fn count_rows(&self, path: &NodePath, key: &str) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            &format!(
                r#"SELECT COUNT(*) FROM {} WHERE "node" = ?1 AND "key" = ?2"#,
                self.table.quoted()
            ),
            params![path.encode(), key],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get table statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.connect()?;
        let (nodes, keys): (i64, i64) = conn.query_row(
            &format!(
                r#"SELECT
                     COALESCE(SUM(CASE WHEN "key" = '' THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN "key" <> '' THEN 1 ELSE 0 END), 0)
                   FROM {}"#,
                self.table.quoted()
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreStats {
            table: self.table.to_string(),
            nodes: nodes as usize,
            keys: keys as usize,
        })
    }
}

/// The empty key is reserved for the sentinel row
fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("key must not be empty".to_string()));
    }
    Ok(())
}

/// Sentinel rows for the root down to `path`, skipping those already present
fn insert_sentinels(conn: &Connection, table: &TableName, path: &NodePath) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(&format!(
        r#"INSERT INTO {} ("node", "key", "value") VALUES (?1, '', NULL)
           ON CONFLICT ("node", "key") DO NOTHING"#,
        table.quoted()
    ))?;
    for node in path.lineage() {
        stmt.execute([node.encode()])?;
    }
    Ok(())
}

/// Table statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub table: String,
    pub nodes: usize,
    pub keys: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Table {}:", self.table)?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Keys: {}", self.keys)
    }
}
