//! Preference documents - whole subtrees as JSON
//!
//! Export walks a tree with `keys`, `lookup` and `child_names`; import
//! rebuilds it with `node` and `put`. Nothing here touches SQL directly.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "scope": "user",
//!   "path": "/parent",
//!   "root": { "name": "parent", "map": { "k": "v" }, "nodes": [ ... ] }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::{Read, Write};
use serde::{Deserialize, Serialize};
use crate::path::{validate_name, NodePath};
use crate::tree::{Node, PreferencesTree};
use crate::{Error, Lookup, Result, Scope};

/// Format version written by this crate
pub const DOCUMENT_VERSION: &str = "1.0";

/// An exported subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub scope: Scope,
    /// Absolute path of the exported node; `root` describes that node
    pub path: NodePath,
    pub root: DocumentNode,
}

/// One node of an exported subtree. A `null` map value is a key stored
/// without a value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentNode {
    pub name: String,
    #[serde(default)]
    pub map: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<DocumentNode>,
}

impl DocumentNode {
    /// Number of nodes in this subtree, itself included
    pub fn node_count(&self) -> usize {
        1 + self.nodes.iter().map(DocumentNode::node_count).sum::<usize>()
    }

    /// Number of keys in this subtree
    pub fn key_count(&self) -> usize {
        self.map.len() + self.nodes.iter().map(DocumentNode::key_count).sum::<usize>()
    }
}

/// Counts reported by [`import`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub nodes: usize,
    pub keys: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} nodes, {} keys", self.nodes, self.keys)
    }
}

impl Document {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(json)?;
        document.check_version()?;
        Ok(document)
    }

    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        let document: Document = serde_json::from_reader(reader)?;
        document.check_version()?;
        Ok(document)
    }

    fn check_version(&self) -> Result<()> {
        let major = self.version.split('.').next().unwrap_or("");
        if major != "1" {
            return Err(Error::InvalidArgument(format!(
                "unsupported document version {:?} (expected {})",
                self.version, DOCUMENT_VERSION
            )));
        }
        Ok(())
    }
}

/// Export `node` and all of its descendants
pub fn export_subtree(node: &Node) -> Result<Document> {
    Ok(Document {
        version: DOCUMENT_VERSION.to_string(),
        scope: node.scope(),
        path: node.path().clone(),
        root: export_recursive(node)?,
    })
}

/// Export the keys of `node` only, without children
pub fn export_node(node: &Node) -> Result<Document> {
    Ok(Document {
        version: DOCUMENT_VERSION.to_string(),
        scope: node.scope(),
        path: node.path().clone(),
        root: DocumentNode {
            name: node.name().to_string(),
            map: export_map(node)?,
            nodes: Vec::new(),
        },
    })
}

fn export_map(node: &Node) -> Result<BTreeMap<String, Option<String>>> {
    let mut map = BTreeMap::new();
    for key in node.keys()? {
        match node.lookup(&key)? {
            Lookup::Value(value) => {
                map.insert(key, Some(value));
            }
            Lookup::Null => {
                map.insert(key, None);
            }
            // Removed since the listing; nothing to export.
            Lookup::Absent => {}
        }
    }
    Ok(map)
}

fn export_recursive(node: &Node) -> Result<DocumentNode> {
    let mut nodes = Vec::new();
    for child in node.children()? {
        nodes.push(export_recursive(&child)?);
    }
    Ok(DocumentNode {
        name: node.name().to_string(),
        map: export_map(node)?,
        nodes,
    })
}

/// Rebuild `document` inside `tree`, merging with what is already there.
///
/// The document's scope must match the tree's.
pub fn import(document: &Document, tree: &PreferencesTree) -> Result<ImportStats> {
    document.check_version()?;
    if document.scope != tree.scope() {
        return Err(Error::InvalidArgument(format!(
            "document is for the {} scope, tree is {}",
            document.scope,
            tree.scope()
        )));
    }

    let target = tree.root().node(&document.path.absolute())?;
    let mut stats = ImportStats::default();
    import_recursive(&target, &document.root, &mut stats)?;
    tracing::debug!(path = %document.path, %stats, "imported document");
    Ok(stats)
}

fn import_recursive(node: &Node, source: &DocumentNode, stats: &mut ImportStats) -> Result<()> {
    stats.nodes += 1;
    for (key, value) in &source.map {
        match value {
            Some(value) => node.put(key, value)?,
            None => node.put_null(key)?,
        }
        stats.keys += 1;
    }
    for child in &source.nodes {
        validate_name(&child.name)?;
        import_recursive(&node.node(&child.name)?, child, stats)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NodeStore;

    fn tree(scope: Scope) -> PreferencesTree {
        PreferencesTree::new(NodeStore::open_in_memory().unwrap(), scope)
    }

    fn sample(tree: &PreferencesTree) {
        tree.root().put("top", "level").unwrap();
        let parent = tree.node("parent").unwrap();
        parent.put("color", "blue").unwrap();
        parent.put_null("nothing").unwrap();
        let deeper = tree.node("parent/child/deeper").unwrap();
        deeper.put("depth", "3").unwrap();
        tree.node("parent/child/deeper/khazad-dum").unwrap();
        tree.node("uncle").unwrap().put("k", "v").unwrap();
    }

    #[test]
    fn test_export_shape() {
        let tree = tree(Scope::User);
        sample(&tree);

        let document = export_subtree(&tree.root()).unwrap();
        assert_eq!(document.scope, Scope::User);
        assert!(document.path.is_root());
        assert_eq!(document.root.node_count(), 6);
        assert_eq!(document.root.key_count(), 5);

        let names: Vec<_> = document.root.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["parent", "uncle"]);
        let parent = &document.root.nodes[0];
        assert_eq!(parent.map.get("color"), Some(&Some("blue".to_string())));
        assert_eq!(parent.map.get("nothing"), Some(&None));
    }

    #[test]
    fn test_export_node_has_no_children() {
        let tree = tree(Scope::User);
        sample(&tree);

        let document = export_node(&tree.node("parent").unwrap()).unwrap();
        assert_eq!(document.path.absolute(), "/parent");
        assert_eq!(document.root.map.len(), 2);
        assert!(document.root.nodes.is_empty());
    }

    #[test]
    fn test_round_trip_through_json() {
        let tree = tree(Scope::System);
        sample(&tree);

        let exported = export_subtree(&tree.root()).unwrap();
        let json = exported.to_json_string().unwrap();

        tree.clear_all().unwrap();
        assert!(tree.root().child_names().unwrap().is_empty());

        let document = Document::from_json_str(&json).unwrap();
        let stats = import(&document, &tree).unwrap();
        assert_eq!(stats, ImportStats { nodes: 6, keys: 5 });

        assert_eq!(export_subtree(&tree.root()).unwrap(), exported);
        let deeper = tree.node("parent/child/deeper").unwrap();
        assert_eq!(deeper.get("depth").unwrap(), Some("3".to_string()));
        assert_eq!(deeper.child_names().unwrap(), vec!["khazad-dum"]);
        assert_eq!(tree.node("parent").unwrap().lookup("nothing").unwrap(), Lookup::Null);
    }

    #[test]
    fn test_import_subtree_at_path() {
        let source = tree(Scope::User);
        sample(&source);
        let document = export_subtree(&source.node("parent/child").unwrap()).unwrap();

        let target = tree(Scope::User);
        import(&document, &target).unwrap();

        assert!(target.node_exists("parent/child/deeper/khazad-dum").unwrap());
        assert!(!target.node_exists("uncle").unwrap());
    }

    #[test]
    fn test_import_rejects_mismatches() {
        let source = tree(Scope::User);
        sample(&source);
        let mut document = export_subtree(&source.root()).unwrap();

        assert!(import(&document, &tree(Scope::System)).is_err());

        document.version = "2.0".to_string();
        let json = serde_json::to_string(&document).unwrap();
        assert!(matches!(Document::from_json_str(&json), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_import_rejects_bad_names() {
        let document = Document {
            version: DOCUMENT_VERSION.to_string(),
            scope: Scope::User,
            path: NodePath::root(),
            root: DocumentNode {
                name: String::new(),
                map: BTreeMap::new(),
                nodes: vec![DocumentNode {
                    name: "a/b".to_string(),
                    ..Default::default()
                }],
            },
        };
        assert!(matches!(import(&document, &tree(Scope::User)), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_write_and_read_json() {
        let tree = tree(Scope::User);
        sample(&tree);
        let document = export_subtree(&tree.root()).unwrap();

        let mut buffer = Vec::new();
        document.write_json(&mut buffer).unwrap();
        let back = Document::read_json(buffer.as_slice()).unwrap();
        assert_eq!(back, document);
    }
}
