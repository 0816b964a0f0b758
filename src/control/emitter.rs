use uuid::Uuid;

use crate::state::{Delta, KeyPath, Node};
use crate::timeline::{Command, Message};

/// Sender name stamped on every message the runtime emits.
pub const INSTRUMENTER_NAME: &str = "StateScopeInstrumenter";

/// Digits in `u64::MAX`.
const ID_COUNTER_WIDTH: usize = 20;

/// One dispatched transition, before it is stamped with an id and timestamp.
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    pub context: String,
    /// Container name. Empty for anonymous containers.
    pub container: String,
    /// Message type. `None` records a container initialization.
    pub message_type: Option<String>,
    pub path: KeyPath,
    pub data: Option<Node>,
    pub relay: Option<Node>,
    pub delta: Option<Delta>,
    pub commands: Vec<Command>,
}

/// Stamps dispatches with session-scoped ids and wall-clock timestamps.
#[derive(Debug, Clone)]
pub struct MessageEmitter {
    session: String,
    counter: u64,
}

impl Default for MessageEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageEmitter {
    pub fn new() -> Self {
        Self::with_session(Uuid::new_v4().simple().to_string())
    }

    pub fn with_session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            counter: 0,
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Next message id. Counters start at 1 and never repeat within a session.
    ///
    /// The counter is padded to the full width of a `u64`, so ids of one
    /// session sort lexicographically in emission order.
    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}-{:0width$}", self.session, self.counter, width = ID_COUNTER_WIDTH)
    }

    pub fn emit(&mut self, dispatch: Dispatch) -> Message {
        let name = if dispatch.container.is_empty() {
            "{Anonymous Container}".to_string()
        } else {
            dispatch.container
        };
        let message_type = dispatch
            .message_type
            .unwrap_or_else(|| format!("Init ({name})"));

        Message {
            id: self.next_id(),
            name,
            context: dispatch.context,
            ts: chrono::Utc::now().timestamp_millis(),
            message_type,
            from: Some(INSTRUMENTER_NAME.to_string()),
            path: dispatch.path,
            data: dispatch.data,
            relay: dispatch.relay,
            commands: dispatch.commands,
            delta: dispatch.delta,
            prior: None,
        }
    }
}
