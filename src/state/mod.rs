//! Immutable, structurally shared state trees.
//!
//! A [`Node`] is shaped like JSON, but its containers sit behind `Arc`.
//! Object keys keep the order they were inserted in.
//! Cloning a node costs one reference-count bump, and two nodes can be
//! compared by identity with [`Node::ptr_eq`]. The delta codec relies on
//! this: it copies only the spine it modifies, so every untouched subtree
//! stays reference-identical across a transition.

pub mod delta;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub use delta::{apply_delta, Delta, DeltaOp};

/// A sequence of keys locating a value inside a state tree.
///
/// Array elements are addressed by their decimal index (`"0"`, `"1"`, ...).
pub type KeyPath = Vec<String>;

/// Object storage for [`Node::Object`]. Keys keep their insertion order.
pub type NodeMap = IndexMap<String, Node>;

/// Build a [`KeyPath`] from string-like segments.
pub fn key_path<I, S>(segments: I) -> KeyPath
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    segments.into_iter().map(Into::into).collect()
}

/// An immutable JSON-shaped value with shared containers.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Node>>),
    Object(Arc<NodeMap>),
}

impl Node {
    /// An empty object (`{}`).
    pub fn empty_object() -> Self {
        Node::Object(Arc::new(NodeMap::new()))
    }

    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Node)>,
        K: Into<String>,
    {
        Node::Object(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array<I: IntoIterator<Item = Node>>(items: I) -> Self {
        Node::Array(Arc::new(items.into_iter().collect()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// True for objects and arrays, the values a tracked read descends into.
    pub fn is_container(&self) -> bool {
        matches!(self, Node::Object(_) | Node::Array(_))
    }

    pub fn as_object(&self) -> Option<&NodeMap> {
        match self {
            Node::Object(map) => Some(&**map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Look up a direct child by key. Arrays accept decimal index keys.
    pub fn child(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(map) => map.get(key),
            Node::Array(items) => parse_index(key).and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Look up a descendant by path. The empty path yields `self`.
    pub fn get_path(&self, path: &[String]) -> Option<&Node> {
        path.iter().try_fold(self, |node, key| node.child(key))
    }

    /// Enumerate the keys of a container in iteration order.
    ///
    /// Arrays enumerate their indices; scalars have no keys.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Node::Object(map) => map.keys().cloned().collect(),
            Node::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Reference identity of two containers.
    ///
    /// Scalars have no identity of their own, so they compare by value.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Object(a), Node::Object(b)) => Arc::ptr_eq(a, b),
            (Node::Array(a), Node::Array(b)) => Arc::ptr_eq(a, b),
            (Node::String(a), Node::String(b)) => Arc::ptr_eq(a, b) || a == b,
            (a, b) if !a.is_container() && !b.is_container() => a == b,
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

pub(crate) fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse().ok()
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(Arc::from(s)),
            Value::Array(items) => Node::Array(Arc::new(items.into_iter().map(Node::from).collect())),
            Value::Object(map) => Node::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, Node::from(v))).collect(),
            )),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(b),
            Node::Number(n) => Value::Number(n),
            Node::String(s) => Value::String(s.to_string()),
            Node::Array(items) => Value::Array(items.iter().cloned().map(Value::from).collect()),
            Node::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(Arc::from(s))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Number(n.into())
    }
}

impl From<i32> for Node {
    fn from(n: i32) -> Self {
        Node::Number(n.into())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
