//! Preference tree - node handles over the flat store
//!
//! A [`PreferencesTree`] owns a registry mapping each path to the handle
//! state shared by every [`Node`] for that path. Handles are cheap clones;
//! removing a node marks the shared state so every outstanding handle for
//! it (and for its cached descendants) sees the removal.
//!
//! Failure handling is split in two tiers:
//! - value operations (`get`, `put`, `remove`, `clear`, child creation)
//!   log store failures and fall back to "absent" or a no-op;
//! - structural operations (`keys`, `child_names`, `node_exists`,
//!   `remove_node`) surface them as [`Error::BackingStore`].
//!
//! Invalid arguments and use of a removed node are always returned as errors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use crate::path::{NodePath, SEPARATOR};
use crate::storage::{NodeStore, StoreStats, MAX_KEY_LENGTH, MAX_VALUE_LENGTH};
use crate::{Error, Lookup, Result, Scope};

/// Registry state for one path
#[derive(Debug)]
struct NodeEntry {
    path: NodePath,
    removed: AtomicBool,
}

impl NodeEntry {
    fn new(path: NodePath) -> Self {
        Self {
            path,
            removed: AtomicBool::new(false),
        }
    }

    fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }
}

#[derive(Debug)]
struct TreeInner {
    store: NodeStore,
    scope: Scope,
    nodes: Mutex<HashMap<NodePath, Arc<NodeEntry>>>,
}

impl TreeInner {
    fn registry(&self) -> MutexGuard<'_, HashMap<NodePath, Arc<NodeEntry>>> {
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Live entry for `path`, registering a new one if needed
    fn entry(&self, path: &NodePath) -> Arc<NodeEntry> {
        let mut nodes = self.registry();
        if let Some(entry) = nodes.get(path) {
            if !entry.is_removed() {
                return entry.clone();
            }
        }
        let entry = Arc::new(NodeEntry::new(path.clone()));
        nodes.insert(path.clone(), entry.clone());
        entry
    }

    /// Live entry for `path` if one is cached
    fn cached(&self, path: &NodePath) -> Option<Arc<NodeEntry>> {
        self.registry()
            .get(path)
            .filter(|entry| !entry.is_removed())
            .cloned()
    }

    /// Mark `path` and all cached descendants removed and drop them
    fn evict_subtree(&self, path: &NodePath) {
        self.registry().retain(|cached, entry| {
            if path.is_ancestor_of(cached) {
                entry.mark_removed();
                false
            } else {
                true
            }
        });
    }
}

/// One scope's tree of preference nodes
#[derive(Debug, Clone)]
pub struct PreferencesTree {
    inner: Arc<TreeInner>,
}

impl PreferencesTree {
    /// Wrap an opened store. The store must already hold the root node,
    /// which [`NodeStore::open`] guarantees.
    pub fn new(store: NodeStore, scope: Scope) -> Self {
        let tree = Self {
            inner: Arc::new(TreeInner {
                store,
                scope,
                nodes: Mutex::new(HashMap::new()),
            }),
        };
        tree.inner.entry(&NodePath::root());
        tree
    }

    pub fn scope(&self) -> Scope {
        self.inner.scope
    }

    pub fn store(&self) -> &NodeStore {
        &self.inner.store
    }

    /// Handle for the root node
    pub fn root(&self) -> Node {
        let entry = self.inner.entry(&NodePath::root());
        Node {
            tree: self.inner.clone(),
            entry,
        }
    }

    /// Handle for the node at `path`, creating it and any missing ancestors
    pub fn node(&self, path: &str) -> Result<Node> {
        self.root().node(path)
    }

    /// Whether a node exists at `path` in the store
    pub fn node_exists(&self, path: &str) -> Result<bool> {
        self.root().node_exists(path)
    }

    /// Remove every node and key, leaving an empty root.
    /// All outstanding handles other than the root become removed.
    pub fn clear_all(&self) -> Result<()> {
        self.inner
            .store
            .remove_subtree(&NodePath::root())
            .map_err(surfaced)?;
        self.inner.registry().retain(|path, entry| {
            if path.is_root() {
                true
            } else {
                entry.mark_removed();
                false
            }
        });
        Ok(())
    }

    /// Drop every cached handle.
    ///
    /// Handles already given out keep working against the store, but
    /// removals made through new handles are no longer reflected in them.
    pub fn reset(&self) {
        self.inner.registry().clear();
        self.inner.entry(&NodePath::root());
    }

    /// Number of handles currently cached
    pub fn cached_nodes(&self) -> usize {
        self.inner.registry().len()
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.inner.store.stats().map_err(surfaced)
    }
}

/// Handle to one node of a [`PreferencesTree`]
#[derive(Clone)]
pub struct Node {
    tree: Arc<TreeInner>,
    entry: Arc<NodeEntry>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.entry.path)
            .field("scope", &self.tree.scope)
            .field("removed", &self.entry.is_removed())
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.entry.path == other.entry.path
    }
}

impl Eq for Node {}

impl Node {
    pub fn path(&self) -> &NodePath {
        &self.entry.path
    }

    /// Last path segment; empty for the root
    pub fn name(&self) -> &str {
        self.entry.path.name()
    }

    /// `/`-prefixed absolute path
    pub fn absolute_path(&self) -> String {
        self.entry.path.absolute()
    }

    pub fn scope(&self) -> Scope {
        self.tree.scope
    }

    pub fn is_user_node(&self) -> bool {
        self.tree.scope.is_user()
    }

    pub fn is_removed(&self) -> bool {
        self.entry.is_removed()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.entry.is_removed() {
            return Err(Error::NodeRemoved(self.absolute_path()));
        }
        Ok(())
    }

    /// Resolve `path` against this node; a leading `/` resolves from the root
    fn resolve(&self, path: &str) -> Result<NodePath> {
        if path.starts_with(SEPARATOR) {
            NodePath::parse(path)
        } else {
            self.entry.path.join(path)
        }
    }

    /// Parent handle; `None` for the root
    pub fn parent(&self) -> Result<Option<Node>> {
        self.ensure_live()?;
        Ok(self.entry.path.parent().map(|path| {
            let entry = self.tree.entry(&path);
            Node {
                tree: self.tree.clone(),
                entry,
            }
        }))
    }

    // ========== Structure ==========

    /// Handle for the node at `path`, relative to this node unless it starts
    /// with `/`. Nodes missing along the way are created in the store.
    ///
    /// Creation is issued even for cached handles, since another tree over
    /// the same table may have removed the node. Handles are registered only
    /// once the store holds the node; if creation fails the handle is
    /// returned unregistered and the next call retries.
    pub fn node(&self, path: &str) -> Result<Node> {
        self.ensure_live()?;
        let target = self.resolve(path)?;

        let entry = match self.tree.store.create_node(&target) {
            Ok(()) => target
                .lineage()
                .map(|node| self.tree.entry(&node))
                .last()
                .unwrap_or_else(|| self.tree.entry(&target)),
            Err(e) => {
                tracing::error!(node = %target, "failed to create node: {}", e);
                self.tree
                    .cached(&target)
                    .unwrap_or_else(|| Arc::new(NodeEntry::new(target.clone())))
            }
        };

        Ok(Node {
            tree: self.tree.clone(),
            entry,
        })
    }

    /// Whether the node at `path` exists in the store.
    ///
    /// `node_exists("")` on a removed handle is `false` rather than an error.
    pub fn node_exists(&self, path: &str) -> Result<bool> {
        if self.entry.is_removed() {
            if path.is_empty() {
                return Ok(false);
            }
            return Err(Error::NodeRemoved(self.absolute_path()));
        }
        let target = self.resolve(path)?;
        self.tree.store.node_exists(&target).map_err(surfaced)
    }

    /// Names of the immediate children, sorted
    pub fn child_names(&self) -> Result<Vec<String>> {
        self.ensure_live()?;
        self.tree
            .store
            .list_immediate_children(&self.entry.path)
            .map_err(surfaced)
    }

    /// Handles for the immediate children, sorted by name
    pub fn children(&self) -> Result<Vec<Node>> {
        self.child_names()?
            .iter()
            .map(|name| self.node(name))
            .collect()
    }

    /// Delete this node and its whole subtree from the store immediately.
    ///
    /// The root cannot be removed; use [`PreferencesTree::clear_all`].
    pub fn remove_node(&self) -> Result<()> {
        self.ensure_live()?;
        if self.entry.path.is_root() {
            return Err(Error::InvalidArgument("the root node cannot be removed".to_string()));
        }
        let rows = self
            .tree
            .store
            .remove_subtree(&self.entry.path)
            .map_err(surfaced)?;
        self.tree.evict_subtree(&self.entry.path);
        tracing::debug!(node = %self.entry.path, rows, "node removed");
        Ok(())
    }

    /// Writes are synchronous, so there is nothing to push. A removed node
    /// returns silently.
    pub fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Writes are synchronous, so there is nothing to pull.
    pub fn sync(&self) -> Result<()> {
        self.ensure_live()
    }

    // ========== Keys ==========

    /// Keys stored at this node, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        self.ensure_live()?;
        self.tree.store.list_keys(&self.entry.path).map_err(surfaced)
    }

    /// Look up `key`, distinguishing a NULL value from an absent key.
    /// Store failures read as [`Lookup::Absent`].
    pub fn lookup(&self, key: &str) -> Result<Lookup> {
        validate_key(key)?;
        self.ensure_live()?;
        Ok(self.best_effort("get", self.tree.store.get(&self.entry.path, key), Lookup::Absent))
    }

    /// Value of `key`, or `None` when absent, NULL or unreadable
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lookup(key)?.into_value())
    }

    pub fn get_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// `true`/`false` (any case); anything else yields `default`
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.get(key)? {
            Some(value) if value.eq_ignore_ascii_case("true") => true,
            Some(value) if value.eq_ignore_ascii_case("false") => false,
            _ => default,
        })
    }

    pub fn get_i64(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self
            .get(key)?
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default))
    }

    pub fn get_f64(&self, key: &str, default: f64) -> Result<f64> {
        Ok(self
            .get(key)?
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default))
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        validate_value(value)?;
        self.put_value(key, Some(value))
    }

    /// Store `key` with a NULL value
    pub fn put_null(&self, key: &str) -> Result<()> {
        self.put_value(key, None)
    }

    pub fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, if value { "true" } else { "false" })
    }

    pub fn put_i64(&self, key: &str, value: i64) -> Result<()> {
        self.put(key, &value.to_string())
    }

    pub fn put_f64(&self, key: &str, value: f64) -> Result<()> {
        self.put(key, &value.to_string())
    }

    fn put_value(&self, key: &str, value: Option<&str>) -> Result<()> {
        validate_key(key)?;
        self.ensure_live()?;
        self.best_effort("put", self.tree.store.put(&self.entry.path, key, value), ());
        Ok(())
    }

    /// Remove `key`; removing an absent key does nothing
    pub fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.ensure_live()?;
        self.best_effort("remove", self.tree.store.remove(&self.entry.path, key).map(|_| ()), ());
        Ok(())
    }

    /// Remove every key at this node; children are untouched
    pub fn clear(&self) -> Result<()> {
        self.ensure_live()?;
        self.best_effort("clear", self.tree.store.clear_keys(&self.entry.path).map(|_| ()), ());
        Ok(())
    }

    fn best_effort<T>(&self, op: &str, result: Result<T>, default: T) -> T {
        result.unwrap_or_else(|e| {
            tracing::error!(node = %self.entry.path, "{} failed: {}", op, e);
            default
        })
    }
}

/// Keys are not blank (the empty key marks node existence) and fit the column
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidArgument("key must not be blank".to_string()));
    }
    let len = key.chars().count();
    if len > MAX_KEY_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "key is {} characters long (max {})",
            len, MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_value(value: &str) -> Result<()> {
    let len = value.chars().count();
    if len > MAX_VALUE_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "value is {} characters long (max {})",
            len, MAX_VALUE_LENGTH
        )));
    }
    Ok(())
}

/// Structural failures are reported as an unavailable backing store
fn surfaced(err: Error) -> Error {
    match err {
        Error::Storage(e) => Error::BackingStore(e.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TableName;

    fn tree() -> PreferencesTree {
        PreferencesTree::new(NodeStore::open_in_memory().unwrap(), Scope::User)
    }

    #[test]
    fn test_created_node_exists_without_keys() {
        let tree = tree();
        let node = tree.node("app/settings").unwrap();

        assert!(tree.node_exists("app/settings").unwrap());
        assert!(tree.node_exists("/app").unwrap());
        assert!(node.keys().unwrap().is_empty());
        assert_eq!(node.name(), "settings");
        assert_eq!(node.absolute_path(), "/app/settings");
    }

    #[test]
    fn test_put_get_null_and_absent() {
        let tree = tree();
        let node = tree.node("app").unwrap();

        node.put("theme", "dark").unwrap();
        node.put_null("cleared").unwrap();

        assert_eq!(node.get("theme").unwrap(), Some("dark".to_string()));
        assert_eq!(node.lookup("cleared").unwrap(), Lookup::Null);
        assert_eq!(node.lookup("missing").unwrap(), Lookup::Absent);
        assert_eq!(node.keys().unwrap(), vec!["cleared", "theme"]);
    }

    #[test]
    fn test_put_twice_keeps_one_row() {
        let tree = tree();
        let node = tree.node("app").unwrap();

        node.put("size", "1").unwrap();
        node.put("size", "2").unwrap();

        assert_eq!(node.get("size").unwrap(), Some("2".to_string()));
        assert_eq!(tree.store().count_rows(node.path(), "size").unwrap(), 1);
    }

    #[test]
    fn test_typed_accessors() {
        let tree = tree();
        let node = tree.node("app").unwrap();

        node.put_bool("enabled", true).unwrap();
        node.put_i64("count", -42).unwrap();
        node.put_f64("ratio", 0.5).unwrap();
        node.put("junk", "not a number").unwrap();

        assert!(node.get_bool("enabled", false).unwrap());
        assert_eq!(node.get_i64("count", 0).unwrap(), -42);
        assert_eq!(node.get_f64("ratio", 0.0).unwrap(), 0.5);
        assert_eq!(node.get_i64("junk", 7).unwrap(), 7);
        assert!(!node.get_bool("junk", false).unwrap());
        assert_eq!(node.get_or("missing", "fallback").unwrap(), "fallback");
    }

    #[test]
    fn test_argument_validation() {
        let tree = tree();
        let node = tree.node("app").unwrap();

        assert!(matches!(node.put("", "v"), Err(Error::InvalidArgument(_))));
        assert!(matches!(node.put(" ", "v"), Err(Error::InvalidArgument(_))));
        assert!(matches!(node.put_null("\t"), Err(Error::InvalidArgument(_))));
        assert!(node.keys().unwrap().is_empty());
        assert!(node.put(&"k".repeat(MAX_KEY_LENGTH + 1), "v").is_err());
        assert!(node.put("k", &"v".repeat(MAX_VALUE_LENGTH + 1)).is_err());
        assert!(node.put("k", &"v".repeat(MAX_VALUE_LENGTH)).is_ok());
        assert!(tree.node("a//b").is_err());
    }

    #[test]
    fn test_remove_absent_key() {
        let tree = tree();
        let node = tree.node("app").unwrap();
        node.put("kept", "v").unwrap();

        node.remove("missing").unwrap();
        assert_eq!(node.keys().unwrap(), vec!["kept"]);
    }

    #[test]
    fn test_child_names_one_level() {
        let tree = tree();
        tree.node("parent/child/deeper").unwrap();
        tree.node("uncle").unwrap();

        let parent = tree.node("parent").unwrap();
        assert_eq!(parent.child_names().unwrap(), vec!["child"]);
        assert_eq!(tree.root().child_names().unwrap(), vec!["parent", "uncle"]);

        let children = parent.children().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].absolute_path(), "/parent/child");
    }

    #[test]
    fn test_remove_node_removes_subtree() {
        let tree = tree();
        let parent = tree.node("parent").unwrap();
        let child = parent.node("child").unwrap();
        let deeper = child.node("deeper").unwrap();
        let other = tree.node("parent-other").unwrap();
        other.put("k", "v").unwrap();

        parent.remove_node().unwrap();

        assert!(!tree.node_exists("parent").unwrap());
        assert!(!tree.node_exists("parent/child").unwrap());
        assert!(!tree.node_exists("parent/child/deeper").unwrap());
        assert!(tree.node_exists("parent-other").unwrap());
        assert_eq!(other.get("k").unwrap(), Some("v".to_string()));

        assert!(child.is_removed());
        assert!(deeper.is_removed());
        assert!(!other.is_removed());
    }

    #[test]
    fn test_removed_handle_rejects_use() {
        let tree = tree();
        let node = tree.node("gone").unwrap();
        let alias = tree.node("gone").unwrap();
        node.remove_node().unwrap();

        assert!(matches!(alias.put("k", "v"), Err(Error::NodeRemoved(_))));
        assert!(matches!(alias.keys(), Err(Error::NodeRemoved(_))));
        assert!(matches!(alias.sync(), Err(Error::NodeRemoved(_))));
        assert!(alias.flush().is_ok());
        assert!(!alias.node_exists("").unwrap());
        assert!(alias.node_exists("x").is_err());
        assert!(alias.remove_node().is_err());
    }

    #[test]
    fn test_recreate_after_remove() {
        let tree = tree();
        let old = tree.node("app").unwrap();
        old.put("k", "v").unwrap();
        old.remove_node().unwrap();

        let fresh = tree.node("app").unwrap();
        assert!(!fresh.is_removed());
        assert!(tree.node_exists("app").unwrap());
        assert!(fresh.keys().unwrap().is_empty());
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let tree = tree();
        assert!(matches!(tree.root().remove_node(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_clear_all() {
        let tree = tree();
        let node = tree.node("a/b").unwrap();
        tree.root().put("top", "1").unwrap();

        tree.clear_all().unwrap();

        assert!(node.is_removed());
        assert!(tree.root().child_names().unwrap().is_empty());
        assert!(tree.root().keys().unwrap().is_empty());
        assert!(tree.node_exists("").unwrap());
    }

    #[test]
    fn test_clear_keeps_children() {
        let tree = tree();
        let node = tree.node("app").unwrap();
        node.node("child").unwrap();
        node.put("a", "1").unwrap();

        node.clear().unwrap();

        assert!(node.keys().unwrap().is_empty());
        assert_eq!(node.child_names().unwrap(), vec!["child"]);
    }

    #[test]
    fn test_registry_shares_handles() {
        let tree = tree();
        let a = tree.node("x/y").unwrap();
        let b = tree.root().node("x").unwrap().node("y").unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.cached_nodes(), 3);

        let parent = a.parent().unwrap().unwrap();
        assert_eq!(parent.absolute_path(), "/x");
        assert!(tree.root().parent().unwrap().is_none());

        tree.reset();
        assert_eq!(tree.cached_nodes(), 1);
        assert!(tree.node_exists("x/y").unwrap());
    }

    #[test]
    fn test_absolute_path_from_child() {
        let tree = tree();
        let child = tree.node("a/b").unwrap();
        let other = child.node("/c").unwrap();
        assert_eq!(other.absolute_path(), "/c");
        assert_eq!(child.node("d").unwrap().absolute_path(), "/a/b/d");
    }

    #[test]
    fn test_store_failure_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("prefs.db");
        let tree = PreferencesTree::new(NodeStore::open(&db, TableName::default()).unwrap(), Scope::System);
        let node = tree.node("app").unwrap();
        node.put("k", "v").unwrap();

        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute("DROP TABLE \"preferences\"", []).unwrap();
        drop(conn);

        // Value tier: failures read as absent / no-op.
        assert_eq!(node.get("k").unwrap(), None);
        assert!(node.put("k", "w").is_ok());
        assert!(node.remove("k").is_ok());

        // Structural tier: failures surface.
        assert!(matches!(node.keys(), Err(Error::BackingStore(_))));
        assert!(matches!(node.child_names(), Err(Error::BackingStore(_))));
        assert!(matches!(tree.node_exists("app"), Err(Error::BackingStore(_))));
        assert!(matches!(node.remove_node(), Err(Error::BackingStore(_))));
        assert!(!node.is_removed());
    }

    #[test]
    fn test_node_recreated_after_removal_by_other_tree() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("prefs.db");
        let first = PreferencesTree::new(NodeStore::open(&db, TableName::default()).unwrap(), Scope::User);
        let second = PreferencesTree::new(NodeStore::open(&db, TableName::default()).unwrap(), Scope::User);

        let held = first.node("app/window").unwrap();
        second.node("app").unwrap().remove_node().unwrap();
        assert!(!first.node_exists("app").unwrap());

        first.node("app/window").unwrap().put("k", "v").unwrap();
        assert!(first.node_exists("app/window").unwrap());
        assert_eq!(first.root().child_names().unwrap(), vec!["app"]);
        assert_eq!(second.node("app").unwrap().child_names().unwrap(), vec!["window"]);

        // A handle held across the removal writes its node back first.
        second.node("app").unwrap().remove_node().unwrap();
        held.put("k2", "v").unwrap();
        assert!(second.node_exists("app/window").unwrap());
        assert_eq!(held.keys().unwrap(), vec!["k2"]);
    }

    #[test]
    fn test_handle_from_before_reset_keeps_node_alive() {
        let tree = tree();
        let old = tree.node("app").unwrap();
        tree.reset();
        tree.node("app").unwrap().remove_node().unwrap();

        assert!(!old.is_removed());
        old.put("k", "v").unwrap();
        assert!(tree.node_exists("app").unwrap());
        assert_eq!(tree.root().child_names().unwrap(), vec!["app"]);
    }

    #[test]
    fn test_failed_creation_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("prefs.db");
        let store = NodeStore::open_with_timeout(&db, TableName::default(), std::time::Duration::from_millis(50)).unwrap();
        let tree = PreferencesTree::new(store, Scope::User);

        let locker = rusqlite::Connection::open(&db).unwrap();
        locker.execute_batch("BEGIN EXCLUSIVE").unwrap();
        let pending = tree.node("app").unwrap();
        assert_eq!(tree.cached_nodes(), 1);
        locker.execute_batch("ROLLBACK").unwrap();
        drop(locker);

        assert!(!tree.node_exists("app").unwrap());
        let node = tree.node("app").unwrap();
        assert!(tree.node_exists("app").unwrap());
        assert_eq!(tree.cached_nodes(), 2);

        pending.put("k", "v").unwrap();
        assert_eq!(node.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_scope_flags() {
        let tree = PreferencesTree::new(NodeStore::open_in_memory().unwrap(), Scope::System);
        assert!(!tree.root().is_user_node());
        assert_eq!(tree.node("a").unwrap().scope(), Scope::System);
    }
}
