//! Structured deltas and their immutable application.
//!
//! On the wire a delta is a JSON array of operations:
//!
//! ```text
//! [[["counter"], 1], [["flags", "beta"]]]
//!   ^ set counter=1   ^ delete flags.beta
//! ```

use std::sync::Arc;

use serde::de::Deserializer;
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

use super::{parse_index, KeyPath, Node, NodeMap};

/// Furthest past the end of an array a set may write by index.
///
/// Larger indices are treated as named properties instead of padding the
/// array with nulls.
pub const MAX_ARRAY_GAP: usize = 1024;

/// One operation against a root-relative path.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOp {
    /// Set or replace the value at `path`. An empty path replaces the root.
    Set { path: KeyPath, value: Node },
    /// Remove the deepest key of `path`.
    Delete { path: KeyPath },
}

impl DeltaOp {
    pub fn set(path: KeyPath, value: impl Into<Node>) -> Self {
        DeltaOp::Set {
            path,
            value: value.into(),
        }
    }

    pub fn delete(path: KeyPath) -> Self {
        DeltaOp::Delete { path }
    }

    pub fn path(&self) -> &[String] {
        match self {
            DeltaOp::Set { path, .. } | DeltaOp::Delete { path } => path,
        }
    }

    /// Apply this single operation, sharing every subtree off its path.
    pub fn apply(&self, state: &Node) -> Node {
        match self {
            DeltaOp::Set { path, value } => set_in(state, path, value.clone()),
            DeltaOp::Delete { path } if path.is_empty() => Node::Null,
            DeltaOp::Delete { path } => delete_in(state, path).unwrap_or_else(|| state.clone()),
        }
    }
}

impl Serialize for DeltaOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeltaOp::Set { path, value } => {
                let mut tuple = serializer.serialize_tuple(2)?;
                tuple.serialize_element(path)?;
                tuple.serialize_element(value)?;
                tuple.end()
            }
            DeltaOp::Delete { path } => {
                let mut tuple = serializer.serialize_tuple(1)?;
                tuple.serialize_element(path)?;
                tuple.end()
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireOp {
    Set(KeyPath, Node),
    Delete((KeyPath,)),
}

impl<'de> Deserialize<'de> for DeltaOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireOp::deserialize(deserializer)? {
            WireOp::Set(path, value) => DeltaOp::Set { path, value },
            WireOp::Delete((path,)) => DeltaOp::Delete { path },
        })
    }
}

/// An ordered list of operations describing one state transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(pub Vec<DeltaOp>);

impl Delta {
    pub fn new(ops: Vec<DeltaOp>) -> Self {
        Self(ops)
    }

    pub fn ops(&self) -> &[DeltaOp] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `(path, value)` of a delta made of exactly one set operation.
    pub fn as_single_set(&self) -> Option<(&[String], &Node)> {
        match self.0.as_slice() {
            [DeltaOp::Set { path, value }] => Some((path.as_slice(), value)),
            _ => None,
        }
    }
}

impl From<Vec<DeltaOp>> for Delta {
    fn from(ops: Vec<DeltaOp>) -> Self {
        Self(ops)
    }
}

/// Apply every operation of `delta` in order, producing a new state.
///
/// `state` is never mutated. An empty delta returns a clone of `state`
/// that is reference-identical to it.
pub fn apply_delta(state: &Node, delta: &Delta) -> Node {
    delta
        .ops()
        .iter()
        .fold(state.clone(), |current, op| op.apply(&current))
}

fn set_in(node: &Node, path: &[String], value: Node) -> Node {
    let Some((key, rest)) = path.split_first() else {
        return value;
    };

    match node {
        Node::Object(map) => {
            let mut map = NodeMap::clone(map);
            let child = set_in(map.get(key).unwrap_or(&Node::Null), rest, value);
            map.insert(key.clone(), child);
            Node::Object(Arc::new(map))
        }
        Node::Array(items) => match parse_index(key) {
            Some(index) if index <= items.len().saturating_add(MAX_ARRAY_GAP) => {
                let mut items = Vec::clone(items);
                if index < items.len() {
                    items[index] = set_in(&items[index], rest, value);
                } else {
                    items.resize(index, Node::Null);
                    items.push(set_in(&Node::Null, rest, value));
                }
                Node::Array(Arc::new(items))
            }
            _ => {
                // Named property on an array: keep the elements under their index keys.
                let mut map: NodeMap = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item.clone()))
                    .collect();
                map.insert(key.clone(), set_in(&Node::Null, rest, value));
                Node::Object(Arc::new(map))
            }
        },
        _ => Node::object([(key.clone(), set_in(&Node::Null, rest, value))]),
    }
}

/// Returns `None` when the path does not exist, so callers can keep the input.
fn delete_in(node: &Node, path: &[String]) -> Option<Node> {
    let (key, rest) = path.split_first()?;

    match node {
        Node::Object(map) => {
            let replacement = if rest.is_empty() {
                if !map.contains_key(key) {
                    return None;
                }
                None
            } else {
                Some(delete_in(map.get(key)?, rest)?)
            };
            let mut map = NodeMap::clone(map);
            match replacement {
                Some(child) => map.insert(key.clone(), child),
                None => map.shift_remove(key),
            };
            Some(Node::Object(Arc::new(map)))
        }
        Node::Array(items) => {
            let index = parse_index(key)?;
            let child = items.get(index)?;
            let mut items = Vec::clone(items);
            if rest.is_empty() {
                items.remove(index);
            } else {
                items[index] = delete_in(child, rest)?;
            }
            Some(Node::Array(Arc::new(items)))
        }
        _ => None,
    }
}
