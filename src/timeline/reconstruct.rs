//! Folding recorded deltas into historical state.

use std::ops::Range;

use thiserror::Error;

use crate::state::Node;
use crate::timeline::message::Message;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("Index {index} is beyond the end of a log of {len} messages")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Message not found in log: {0}")]
    UnknownMessage(String),
}

/// Left-fold every message's delta over `state`, in slice order.
///
/// An empty slice returns `state` itself (reference-identical).
pub fn apply_deltas(state: &Node, messages: &[Message]) -> Node {
    messages
        .iter()
        .fold(state.clone(), |current, msg| msg.apply(&current))
}

/// The state immediately before `messages[index]` is applied.
///
/// `index == 0` yields `base` unchanged; `index == messages.len()` yields
/// the final state.
pub fn reconstruct_at(
    base: &Node,
    messages: &[Message],
    index: usize,
) -> Result<Node, ReconstructError> {
    let window = messages
        .get(..index)
        .ok_or(ReconstructError::IndexOutOfRange {
            index,
            len: messages.len(),
        })?;
    Ok(apply_deltas(base, window))
}

/// Position of the message with `id`. Array order is emission order.
pub fn position(messages: &[Message], id: &str) -> Option<usize> {
    messages.iter().position(|msg| msg.id == id)
}

/// The state immediately before the message with `id`.
pub fn state_before(base: &Node, messages: &[Message], id: &str) -> Result<Node, ReconstructError> {
    let index =
        position(messages, id).ok_or_else(|| ReconstructError::UnknownMessage(id.to_string()))?;
    reconstruct_at(base, messages, index)
}

/// Extend a contiguous selection to include `index`.
///
/// Selecting past the end grows the selection forward, selecting before the
/// start grows it backward, and selecting inside it truncates the selection
/// to end at `index`.
pub fn extend_selection(selected: Option<Range<usize>>, index: usize) -> Range<usize> {
    match selected {
        Some(range) if !range.is_empty() => {
            if index >= range.end {
                range.start..index + 1
            } else if index < range.start {
                index..range.end
            } else {
                range.start..index + 1
            }
        }
        _ => index..index + 1,
    }
}

/// States bracketing a selected window of messages.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStates {
    /// State immediately before the first selected message.
    pub before: Node,
    /// State after the last selected message; the time-travel target.
    pub after: Node,
}

/// Compute the replay position and time-travel target for `range`.
pub fn select_window(
    base: &Node,
    messages: &[Message],
    range: Range<usize>,
) -> Result<SelectionStates, ReconstructError> {
    let before = reconstruct_at(base, messages, range.start)?;
    let window = messages
        .get(range.clone())
        .ok_or(ReconstructError::IndexOutOfRange {
            index: range.end,
            len: messages.len(),
        })?;
    let after = apply_deltas(&before, window);
    Ok(SelectionStates { before, after })
}
