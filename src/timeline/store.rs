use std::ops::Range;

use crate::state::Node;
use crate::timeline::message::Message;
use crate::timeline::reconstruct::{
    apply_deltas, position, reconstruct_at, select_window, ReconstructError, SelectionStates,
};

/// What happens to the captured history when the log is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Drop the messages and keep the existing base snapshot.
    Discard,
    /// Fold every cleared message into a new base snapshot.
    Fold,
}

/// An append-only log of messages on top of a base snapshot.
///
/// Messages are kept in emission order. The log is never spliced; it only
/// grows by [`MessageLog::push`] or is cleared wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageLog {
    initial: Node,
    messages: Vec<Message>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_initial(Node::empty_object())
    }

    pub fn with_initial(initial: Node) -> Self {
        Self {
            initial,
            messages: Vec::new(),
        }
    }

    pub fn from_parts(initial: Node, messages: Vec<Message>) -> Self {
        Self { initial, messages }
    }

    pub fn initial(&self) -> &Node {
        &self.initial
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        if let Some(last) = self.messages.last() {
            if last.id == message.id {
                tracing::debug!(id = %message.id, "Ignoring duplicate message");
                return;
            }
        }
        self.messages.push(message);
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        position(&self.messages, id)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.position(id).map(|index| &self.messages[index])
    }

    /// State after every recorded message.
    pub fn final_state(&self) -> Node {
        apply_deltas(&self.initial, &self.messages)
    }

    /// State immediately before the message at `index`.
    pub fn state_at(&self, index: usize) -> Result<Node, ReconstructError> {
        reconstruct_at(&self.initial, &self.messages, index)
    }

    pub fn select(&self, range: Range<usize>) -> Result<SelectionStates, ReconstructError> {
        select_window(&self.initial, &self.messages, range)
    }

    /// Clear all messages. Returns how many were removed.
    pub fn clear(&mut self, mode: ClearMode) -> usize {
        if mode == ClearMode::Fold {
            self.initial = self.final_state();
        }
        let removed = self.messages.len();
        self.messages.clear();
        tracing::debug!(removed, ?mode, "Cleared message log");
        removed
    }
}
