//! Read-tracking accessors over state trees.
//!
//! A [`Tracked`] value stands in for an object handed to a transition
//! function. Every property read and every key enumeration through it is
//! reported to a [`ReadObserver`] with the full path from the root, before
//! the value is handed back. Nested containers come back wrapped, so a chain
//! like `model.get("a").get("b")` reports `["a"]` and then `["a", "b"]`.

use std::cell::RefCell;

use crate::state::{KeyPath, Node};
use crate::trace::path_set::PathSet;

/// Receives the path of every observed read.
pub trait ReadObserver {
    fn on_read(&self, path: &[String]);
}

impl<F: Fn(&[String])> ReadObserver for F {
    fn on_read(&self, path: &[String]) {
        self(path)
    }
}

/// Accumulates observed reads into a [`PathSet`].
#[derive(Debug, Default)]
pub struct PathRecorder {
    paths: RefCell<PathSet>,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_paths(self) -> PathSet {
        self.paths.into_inner()
    }

    pub fn snapshot(&self) -> PathSet {
        self.paths.borrow().clone()
    }
}

impl ReadObserver for PathRecorder {
    fn on_read(&self, path: &[String]) {
        self.paths.borrow_mut().insert(path);
    }
}

/// A read-only view of a node that reports every access.
///
/// Reading a key that does not exist still reports its path and yields an
/// absent accessor; no access ever panics.
#[derive(Clone)]
pub struct Tracked<'a> {
    node: Option<&'a Node>,
    path: KeyPath,
    observer: &'a dyn ReadObserver,
}

impl<'a> Tracked<'a> {
    /// Wrap `target` at the root path.
    ///
    /// Callers substitute an empty object for absent inputs; the root
    /// itself is never null.
    pub fn new(target: &'a Node, observer: &'a dyn ReadObserver) -> Self {
        Self {
            node: Some(target),
            path: Vec::new(),
            observer,
        }
    }

    /// Path of this accessor from the root.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Read property `key`.
    pub fn get(&self, key: &str) -> Tracked<'a> {
        let mut path = self.path.clone();
        path.push(key.to_string());
        self.observer.on_read(&path);
        Tracked {
            node: self.node.and_then(|node| node.child(key)),
            path,
            observer: self.observer,
        }
    }

    /// Read array element `index`.
    pub fn index(&self, index: usize) -> Tracked<'a> {
        self.get(&index.to_string())
    }

    /// Enumerate own keys, reporting a read for each before returning them.
    pub fn keys(&self) -> Vec<String> {
        let keys = self.node.map(Node::keys).unwrap_or_default();
        let mut path = self.path.clone();
        for key in &keys {
            path.push(key.clone());
            self.observer.on_read(&path);
            path.pop();
        }
        keys
    }

    /// Number of elements. On arrays this is a read of the `length` property.
    pub fn len(&self) -> usize {
        match self.node {
            Some(Node::Array(items)) => {
                let mut path = self.path.clone();
                path.push("length".to_string());
                self.observer.on_read(&path);
                items.len()
            }
            Some(Node::Object(_)) => self.keys().len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate array elements (or object values) through tracked reads.
    pub fn iter(&self) -> impl Iterator<Item = Tracked<'a>> + '_ {
        let keys: Vec<String> = match self.node {
            Some(Node::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => self.keys(),
        };
        keys.into_iter().map(move |key| self.get(&key))
    }

    /// Whether the read resolved to a value.
    pub fn exists(&self) -> bool {
        self.node.is_some()
    }

    /// Absent values read as null, mirroring an `undefined` property.
    pub fn is_null(&self) -> bool {
        self.node.map_or(true, Node::is_null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.node.and_then(Node::as_f64)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.node.and_then(Node::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.node.and_then(Node::as_bool)
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.node.and_then(Node::as_str)
    }

    /// Read the entire subtree, as spreading or serializing it would.
    ///
    /// Every nested path is reported. The returned node shares storage
    /// with the target.
    pub fn materialize(&self) -> Node {
        for key in self.keys() {
            let child = Tracked {
                node: self.node.and_then(|node| node.child(&key)),
                path: {
                    let mut path = self.path.clone();
                    path.push(key);
                    path
                },
                observer: self.observer,
            };
            if child.node.is_some_and(Node::is_container) {
                child.materialize();
            }
        }
        self.node.cloned().unwrap_or_default()
    }
}

impl std::fmt::Debug for Tracked<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked")
            .field("path", &self.path)
            .field("node", &self.node)
            .finish()
    }
}
