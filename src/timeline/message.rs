//! Recorded state transitions.
//!
//! Logs come in two shapes. Newer emitters attach a `delta` against the
//! global root state. Older ones attach `prev`/`next` snapshots plus the
//! container `path`. [`SerializedMessage`] accepts both on the wire, and
//! every message is converted into the canonical [`Message`] immediately,
//! so the rest of the crate only ever sees a [`Delta`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::state::{apply_delta, Delta, DeltaOp, KeyPath, Node};

/// A side-effect descriptor emitted alongside a state change.
///
/// Serialized as a `[name, payload]` pair and carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command(pub String, pub Node);

impl Command {
    pub fn new(name: impl Into<String>, payload: impl Into<Node>) -> Self {
        Self(name.into(), payload.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn payload(&self) -> &Node {
        &self.1
    }
}

/// Wire representation of one recorded transition, in either log form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerializedMessage {
    pub id: String,
    /// Name of the container that handled the transition.
    #[serde(default)]
    pub name: String,
    /// Identifier of the container instance.
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub ts: i64,
    /// Message type, or `Init (<container>)` for initialization.
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default)]
    pub path: KeyPath,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub prev: Option<Node>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub next: Option<Node>,
    #[serde(default)]
    pub delta: Option<Delta>,
    #[serde(default)]
    pub data: Option<Node>,
    #[serde(default)]
    pub relay: Option<Node>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Node>, D::Error> {
    Node::deserialize(deserializer).map(Some)
}

/// The transition a wire message describes, tagged by log form.
#[derive(Debug, Clone, PartialEq)]
pub enum WireTransition {
    Delta(Delta),
    Snapshot {
        path: KeyPath,
        prev: Option<Node>,
        next: Node,
    },
    /// Command-only or otherwise state-neutral message.
    Identity,
}

impl SerializedMessage {
    /// Classify the transition. A `delta` wins over `prev`/`next` when both exist.
    pub fn transition(&self) -> WireTransition {
        match (&self.delta, &self.next) {
            (Some(delta), _) => WireTransition::Delta(delta.clone()),
            (None, Some(next)) => WireTransition::Snapshot {
                path: self.path.clone(),
                prev: self.prev.clone(),
                next: next.clone(),
            },
            (None, None) => WireTransition::Identity,
        }
    }
}

/// Canonical in-memory message: the transition is always a [`Delta`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SerializedMessage", into = "SerializedMessage")]
pub struct Message {
    pub id: String,
    pub name: String,
    pub context: String,
    pub ts: i64,
    pub message_type: String,
    pub from: Option<String>,
    pub path: KeyPath,
    pub data: Option<Node>,
    pub relay: Option<Node>,
    pub commands: Vec<Command>,
    /// `None` for messages that do not change state.
    pub delta: Option<Delta>,
    /// The `prev` snapshot of a legacy message, kept for lossless export.
    pub prior: Option<Node>,
}

impl From<SerializedMessage> for Message {
    fn from(wire: SerializedMessage) -> Self {
        let (delta, prior) = match wire.transition() {
            WireTransition::Delta(delta) => (Some(delta), wire.prev.clone()),
            WireTransition::Snapshot { path, prev, next } => {
                (Some(Delta::new(vec![DeltaOp::Set { path, value: next }])), prev)
            }
            WireTransition::Identity => (None, wire.prev.clone()),
        };

        Self {
            id: wire.id,
            name: wire.name,
            context: wire.context,
            ts: wire.ts,
            message_type: wire.message,
            from: wire.from,
            path: wire.path,
            data: wire.data,
            relay: wire.relay,
            commands: wire.commands,
            delta,
            prior,
        }
    }
}

impl From<Message> for SerializedMessage {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            name: msg.name,
            context: msg.context,
            ts: msg.ts,
            message: msg.message_type,
            from: msg.from,
            path: msg.path,
            prev: msg.prior,
            next: None,
            delta: msg.delta,
            data: msg.data,
            relay: msg.relay,
            commands: msg.commands,
        }
    }
}

impl Message {
    /// Whether this message records a container initialization rather than a dispatch.
    pub fn is_init(&self) -> bool {
        self.message_type.starts_with("Init")
    }

    /// Apply this message's transition to `state`. Messages without a delta are identity steps.
    pub fn apply(&self, state: &Node) -> Node {
        match &self.delta {
            Some(delta) => apply_delta(state, delta),
            None => state.clone(),
        }
    }

    /// Render this message in the `prev`/`next` form.
    ///
    /// `state_before` is the global state immediately before the message.
    /// A single set operation keeps its own path. Any other delta is
    /// expressed as a root replacement, so grafting `next` into `prev`
    /// always reproduces [`Message::apply`].
    pub fn to_legacy(&self, state_before: &Node) -> SerializedMessage {
        let (path, next) = match self.delta.as_ref().and_then(Delta::as_single_set) {
            Some((path, value)) => (path.to_vec(), value.clone()),
            None => (Vec::new(), self.apply(state_before)),
        };

        let mut wire = SerializedMessage::from(self.clone());
        wire.delta = None;
        wire.path = path;
        wire.prev = Some(state_before.clone());
        wire.next = Some(next);
        wire
    }

    /// One-line human-readable description used by `inspect`.
    pub fn summary(&self) -> String {
        let ops = self.delta.as_ref().map_or(0, |d| d.ops().len());
        let commands = if self.commands.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = self.commands.iter().map(Command::name).collect();
            format!(" commands=[{}]", names.join(", "))
        };
        format!(
            "{} {} {}#{} ops={}{}",
            self.id, self.name, self.message_type, self.context, ops, commands
        )
    }
}
