//! Control messages exchanged between the panel and the inspected runtime.

pub mod backend;
pub mod emitter;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::state::Node;
use crate::timeline::{Message, ReconstructError};

pub use backend::{RuntimeBackend, StateSink};
pub use emitter::{Dispatch, MessageEmitter, INSTRUMENTER_NAME};

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Cannot reconstruct state for message '{0}': it is not in the log and carries no prior state")]
    UnknownMessage(String),

    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error("Malformed control message: {0}")]
    Json(#[from] serde_json::Error),
}

/// An inbound control message, recognised by its distinguishing field.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// The panel is ready: flush anything queued for it.
    Initialized,
    /// The peer went away: queue until it is initialized again.
    Disconnected,
    /// Time travel to the state right after this message.
    Selected(Box<Message>),
    /// Replace the live state with an already reconstructed one.
    SetState(Node),
    Other(Value),
}

impl ControlMessage {
    pub fn parse(value: Value) -> Result<Self, ControlError> {
        let Value::Object(mut map) = value else {
            return Ok(Self::Other(value));
        };

        if let Some(selected) = map.remove("selected") {
            let message: Message = serde_json::from_value(selected)?;
            return Ok(Self::Selected(Box::new(message)));
        }
        if let Some(state) = map.remove("setState") {
            return Ok(Self::SetState(Node::from(state)));
        }

        match map.get("state").and_then(Value::as_str) {
            Some("initialized") => Ok(Self::Initialized),
            Some("disconnected") => Ok(Self::Disconnected),
            _ => Ok(Self::Other(Value::Object(map))),
        }
    }

    pub fn to_value(&self) -> Result<Value, ControlError> {
        Ok(match self {
            Self::Initialized => json!({ "state": "initialized" }),
            Self::Disconnected => json!({ "state": "disconnected" }),
            Self::Selected(message) => {
                let mut map = Map::new();
                map.insert("selected".to_string(), serde_json::to_value(&**message)?);
                Value::Object(map)
            }
            Self::SetState(state) => json!({ "setState": state.to_value() }),
            Self::Other(value) => value.clone(),
        })
    }
}
