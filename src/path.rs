//! Node paths - identity of a node inside the flat table
//!
//! A node is identified by the ordered list of its ancestor names. In the
//! table it is stored as those names joined with `/`, with the root stored
//! as the empty string:
//!
//! - root: `""`
//! - `["parent"]`: `"parent"`
//! - `["parent", "child"]`: `"parent/child"`
//!
//! Child and descendant relationships are never stored; they are derived
//! from LIKE patterns built here.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between path segments
pub const SEPARATOR: char = '/';

/// Escape character used in every LIKE pattern built by this module
pub const LIKE_ESCAPE: char = '\\';

/// Maximum length of a single node name
pub const MAX_NAME_LENGTH: usize = 80;

/// Maximum length of an encoded path (width of the `node` column)
pub const MAX_PATH_LENGTH: usize = 255;

/// Path of a node in the preference tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// The root node
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from already-split segments, validating each name
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::root();
        for segment in segments {
            path = path.child(segment)?;
        }
        Ok(path)
    }

    /// Parse a user-facing path string.
    ///
    /// Accepts absolute (`/a/b`) and relative (`a/b`) forms; both resolve
    /// from the root. `""` and `"/"` are the root itself.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.strip_prefix(SEPARATOR).unwrap_or(path);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::from_segments(trimmed.split(SEPARATOR))
    }

    /// Decode a `node` column value as read back from the table
    pub fn decode(stored: &str) -> Result<Self> {
        if stored.starts_with(SEPARATOR) {
            return Err(Error::MalformedPath(format!("stored path has a leading separator: {:?}", stored)));
        }
        Self::parse(stored).map_err(|e| match e {
            Error::InvalidArgument(msg) => Error::MalformedPath(format!("{:?}: {}", stored, msg)),
            other => other,
        })
    }

    /// Encoded form stored in the `node` column
    pub fn encode(&self) -> String {
        self.segments.join("/")
    }

    /// Absolute, user-facing form (`/` for the root)
    pub fn absolute(&self) -> String {
        format!("/{}", self.encode())
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, or `""` for the root
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Parent path; `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// The root, every ancestor, then this path, outermost first
    pub fn lineage(&self) -> impl Iterator<Item = NodePath> + '_ {
        (0..=self.segments.len()).map(|depth| Self {
            segments: self.segments[..depth].to_vec(),
        })
    }

    /// Path of the immediate child `name`
    pub fn child(&self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;

        let mut segments = self.segments.clone();
        segments.push(name);
        let path = Self { segments };

        let encoded_len = path.encode().chars().count();
        if encoded_len > MAX_PATH_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "path {} is {} characters long (max {})",
                path, encoded_len, MAX_PATH_LENGTH
            )));
        }
        Ok(path)
    }

    /// Resolve a relative path string below this node
    pub fn join(&self, relative: &str) -> Result<Self> {
        if relative.is_empty() {
            return Ok(self.clone());
        }
        if relative.starts_with(SEPARATOR) {
            return Err(Error::InvalidArgument(format!("expected a relative path, got {:?}", relative)));
        }
        let mut path = self.clone();
        for segment in relative.split(SEPARATOR) {
            path = path.child(segment)?;
        }
        Ok(path)
    }

    /// True if `other` is this node or one of its descendants
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Immediate child name of `stored`, relative to this node.
    ///
    /// Fails when `stored` is not exactly one level below this node, which
    /// means the listing query was built wrong.
    pub fn decode_child(&self, stored: &str) -> Result<String> {
        let decoded = Self::decode(stored)?;
        if decoded.parent().as_ref() != Some(self) {
            return Err(Error::MalformedPath(format!(
                "{:?} is not an immediate child of {:?}",
                stored,
                self.encode()
            )));
        }
        Ok(decoded.name().to_string())
    }

    /// `(LIKE, NOT LIKE)` patterns selecting exactly one level below this node.
    ///
    /// Stored paths carry no leading separator, so the root uses `%` and
    /// excludes `%/%`. Callers must still exclude the node's own row.
    pub fn immediate_child_pattern(&self) -> (String, String) {
        if self.is_root() {
            return ("%".to_string(), "%/%".to_string());
        }
        let prefix = escape_like(&self.encode());
        (format!("{}/%", prefix), format!("{}/%/%", prefix))
    }

    /// LIKE pattern matching every strict descendant of this node.
    ///
    /// Always paired with an exact match on the node itself; the separator
    /// keeps a sibling such as `ab` out of the subtree of `a`.
    pub fn subtree_pattern(&self) -> String {
        if self.is_root() {
            return "%".to_string();
        }
        format!("{}/%", escape_like(&self.encode()))
    }
}

/// Check a single node name
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("node name must not be empty".to_string()));
    }
    if name.contains(SEPARATOR) {
        return Err(Error::InvalidArgument(format!("node name {:?} contains '/'", name)));
    }
    let len = name.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "node name {:?} is {} characters long (max {})",
            name, len, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Escape LIKE wildcards so a literal path only matches itself
pub fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.absolute())
    }
}

impl FromStr for NodePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NodePath {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.absolute())
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NodePath::parse(&s).map_err(serde::de::Error::custom)
    }
}
