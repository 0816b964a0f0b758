use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::state::KeyPath;

/// An insertion-ordered set of key paths.
///
/// Paths compare element-wise, so `["a", "b"]` is stored once no matter
/// how many times, or through how many accessors, it is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<KeyPath>", into = "Vec<KeyPath>")]
pub struct PathSet {
    paths: Vec<KeyPath>,
    seen: HashSet<KeyPath>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` if it is not already present. Returns whether it was added.
    pub fn insert(&mut self, path: &[String]) -> bool {
        if self.seen.contains(path) {
            return false;
        }
        self.seen.insert(path.to_vec());
        self.paths.push(path.to_vec());
        true
    }

    pub fn contains(&self, path: &[String]) -> bool {
        self.seen.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPath> {
        self.paths.iter()
    }

    pub fn as_slice(&self) -> &[KeyPath] {
        &self.paths
    }

    /// Append every path of `other` that is not yet present, keeping order.
    pub fn extend_unique(&mut self, other: &PathSet) {
        for path in other.iter() {
            self.insert(path);
        }
    }
}

/// Order-preserving, path-deduplicating union of two sets.
///
/// Paths of `a` come first, followed by the paths of `b` not already in `a`.
pub fn merge_unique_paths(a: &PathSet, b: &PathSet) -> PathSet {
    let mut merged = a.clone();
    merged.extend_unique(b);
    merged
}

impl PartialEq for PathSet {
    fn eq(&self, other: &Self) -> bool {
        self.paths == other.paths
    }
}

impl Eq for PathSet {}

impl From<Vec<KeyPath>> for PathSet {
    fn from(paths: Vec<KeyPath>) -> Self {
        paths.into_iter().collect()
    }
}

impl From<PathSet> for Vec<KeyPath> {
    fn from(set: PathSet) -> Self {
        set.paths
    }
}

impl FromIterator<KeyPath> for PathSet {
    fn from_iter<I: IntoIterator<Item = KeyPath>>(iter: I) -> Self {
        let mut set = PathSet::new();
        for path in iter {
            set.insert(&path);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a KeyPath;
    type IntoIter = std::slice::Iter<'a, KeyPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}
