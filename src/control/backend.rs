//! Runtime side of the control protocol.

use std::collections::VecDeque;

use serde_json::{json, Value};

use super::emitter::INSTRUMENTER_NAME;
use super::{ControlError, ControlMessage};
use crate::relay::Connection;
use crate::state::Node;
use crate::timeline::{Message, MessageLog};

/// Receives states produced by time travel.
pub trait StateSink {
    fn apply_state(&mut self, state: Node);
}

impl StateSink for Vec<Node> {
    fn apply_state(&mut self, state: Node) {
        self.push(state);
    }
}

/// Records emitted messages and forwards them to the panel once it is ready.
pub struct RuntimeBackend<C, S> {
    log: MessageLog,
    queue: VecDeque<Value>,
    connected: bool,
    outbound: C,
    sink: S,
}

impl<C: Connection, S: StateSink> RuntimeBackend<C, S> {
    /// Create a backend and announce it on `outbound`.
    ///
    /// Messages recorded before the panel reports `initialized` are queued.
    pub fn new(outbound: C, sink: S) -> Self {
        Self::with_log(outbound, sink, MessageLog::new())
    }

    pub fn with_log(outbound: C, sink: S, log: MessageLog) -> Self {
        let backend = Self {
            log,
            queue: VecDeque::new(),
            connected: false,
            outbound,
            sink,
        };
        let announce = json!({ "from": INSTRUMENTER_NAME, "state": "initialized" });
        if let Err(err) = backend.outbound.send(announce) {
            tracing::warn!(error = %err, "Failed to announce runtime backend");
        }
        backend
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn connection(&self) -> &C {
        &self.outbound
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.outbound
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Record `message` and forward it, or queue it while the panel is away.
    pub fn record(&mut self, message: Message) -> Result<(), ControlError> {
        let value = serde_json::to_value(&message)?;
        self.log.push(message);

        if self.connected {
            if let Err(err) = self.outbound.send(value.clone()) {
                tracing::warn!(error = %err, "Panel unreachable, queuing messages");
                self.connected = false;
                self.queue.push_back(value);
            }
        } else {
            self.queue.push_back(value);
        }
        Ok(())
    }

    pub fn handle(&mut self, control: ControlMessage) -> Result<(), ControlError> {
        match control {
            ControlMessage::Initialized => {
                self.connected = true;
                self.flush();
            }
            ControlMessage::Disconnected => {
                tracing::debug!(pending = self.queue.len(), "Panel disconnected");
                self.connected = false;
            }
            ControlMessage::Selected(message) => {
                let state = self.state_through(&message)?;
                tracing::info!(id = %message.id, "Time travelling to selected message");
                self.sink.apply_state(state);
            }
            ControlMessage::SetState(state) => {
                self.sink.apply_state(state);
            }
            ControlMessage::Other(value) => {
                tracing::debug!(payload = %value, "Ignoring unrecognised control message");
            }
        }
        Ok(())
    }

    /// Global state immediately after `message`.
    ///
    /// Messages this backend recorded are replayed from its own log. Others
    /// must carry the state they were applied to.
    fn state_through(&self, message: &Message) -> Result<Node, ControlError> {
        if let Some(index) = self.log.position(&message.id) {
            return Ok(self.log.state_at(index + 1)?);
        }
        match &message.prior {
            Some(prior) => Ok(message.apply(prior)),
            None => Err(ControlError::UnknownMessage(message.id.clone())),
        }
    }

    fn flush(&mut self) {
        let total = self.queue.len();
        while let Some(value) = self.queue.pop_front() {
            if let Err(err) = self.outbound.send(value.clone()) {
                self.queue.push_front(value);
                self.connected = false;
                tracing::warn!(
                    remaining = self.queue.len(),
                    error = %err,
                    "Flush to panel interrupted"
                );
                return;
            }
        }
        if total > 0 {
            tracing::debug!(delivered = total, "Flushed queued messages to panel");
        }
    }
}
