//! Minimizing fixtures to the paths a transition actually reads.

use crate::state::{DeltaOp, KeyPath, Node};
use crate::trace::path_set::PathSet;

/// Whether `data` has a value at `path`. The empty path never matches.
pub fn has_path(path: &[String], data: &Node) -> bool {
    !path.is_empty() && data.get_path(path).is_some()
}

/// Build the smallest object holding only the values at `paths`.
///
/// Shorter paths are applied first, so a traced parent keeps its whole
/// subtree even when deeper paths were traced too. Paths missing from
/// `data` are skipped.
pub fn deep_pick(data: &Node, paths: &PathSet) -> Node {
    let mut ordered: Vec<&KeyPath> = paths.iter().collect();
    ordered.sort_by_key(|path| path.len());

    ordered
        .into_iter()
        .filter(|path| has_path(path, data))
        .fold(Node::empty_object(), |picked, path| match data.get_path(path) {
            Some(value) => DeltaOp::set(path.clone(), value.clone()).apply(&picked),
            None => picked,
        })
}
