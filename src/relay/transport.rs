//! Transport seam for the relay broker, plus an in-process implementation.
//!
//! The broker only ever sees [`Connection`]s: fire-and-forget sinks for
//! outbound messages. Inbound traffic arrives as [`TransportEvent`]s that a
//! single [`BrokerService`] task handles one at a time, so the registry and
//! queues are never touched by two events at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::broker::Broker;
use super::role::{ConnectMeta, EndpointKey};
use super::RelayError;

pub type ConnectionId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection {0} is closed")]
    Closed(ConnectionId),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Outbound half of a physical connection, as seen by the broker.
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Deliver `message` without waiting for acknowledgement.
    fn send(&self, message: Value) -> Result<(), TransportError>;
}

/// Something endpoints can connect through.
#[async_trait]
pub trait Transport: Send + Sync {
    type Conn: Send;

    async fn connect(&self, name: &str, meta: ConnectMeta) -> Result<Self::Conn, TransportError>;
}

/// Inbound activity delivered to the broker task.
pub enum TransportEvent {
    Connected {
        conn: Arc<dyn Connection>,
        name: String,
        meta: ConnectMeta,
        reply: oneshot::Sender<Result<EndpointKey, RelayError>>,
    },
    Message {
        key: EndpointKey,
        message: Value,
    },
    Disconnected {
        key: EndpointKey,
        connection_id: ConnectionId,
    },
}

/// Owns the broker and applies transport events strictly in arrival order.
pub struct BrokerService {
    broker: Broker,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl BrokerService {
    pub fn new(broker: Broker, events: mpsc::UnboundedReceiver<TransportEvent>) -> Self {
        Self { broker, events }
    }

    /// Process events until every sender is gone, then hand the broker back.
    pub async fn run(mut self) -> Broker {
        while let Some(event) = self.events.recv().await {
            self.handle(event);
        }
        tracing::debug!("Relay event channel closed, stopping broker service");
        self.broker
    }

    pub fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected {
                conn,
                name,
                meta,
                reply,
            } => {
                let result = self.broker.connect(conn, &name, &meta);
                if let Err(err) = &result {
                    tracing::error!(name = %name, error = %err, "Rejected relay connection");
                }
                // The caller may have given up waiting; the registration stands either way.
                let _ = reply.send(result);
            }
            TransportEvent::Message { key, message } => {
                self.broker.on_message(&key, message);
            }
            TransportEvent::Disconnected { key, connection_id } => {
                self.broker.disconnect(&key, connection_id);
            }
        }
    }
}

/// In-process transport backed by tokio channels.
#[derive(Clone)]
pub struct MemoryTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    next_id: Arc<AtomicU64>,
}

impl MemoryTransport {
    /// Start a broker service task for `broker` and return a transport feeding it.
    ///
    /// The task finishes, yielding the broker, once the transport and every
    /// connection made through it have been dropped.
    pub fn spawn(broker: Broker) -> (Self, JoinHandle<Broker>) {
        let (events, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(BrokerService::new(broker, rx).run());
        (
            Self {
                events,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            handle,
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Conn = MemoryConnection;

    async fn connect(&self, name: &str, meta: ConnectMeta) -> Result<MemoryConnection, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (reply, reply_rx) = oneshot::channel();

        self.events
            .send(TransportEvent::Connected {
                conn: Arc::new(ChannelSink { id, tx: inbound_tx }),
                name: name.to_string(),
                meta,
                reply,
            })
            .map_err(|_| RelayError::BrokerClosed)?;

        let key = reply_rx.await.map_err(|_| RelayError::BrokerClosed)??;

        Ok(MemoryConnection {
            key,
            id,
            events: self.events.clone(),
            inbound,
            closed: false,
        })
    }
}

/// Endpoint side of a [`MemoryTransport`] connection.
///
/// Dropping it disconnects.
pub struct MemoryConnection {
    key: EndpointKey,
    id: ConnectionId,
    events: mpsc::UnboundedSender<TransportEvent>,
    inbound: mpsc::UnboundedReceiver<Value>,
    closed: bool,
}

impl MemoryConnection {
    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, message: Value) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed(self.id));
        }
        self.events
            .send(TransportEvent::Message {
                key: self.key.clone(),
                message,
            })
            .map_err(|_| RelayError::BrokerClosed.into())
    }

    pub async fn recv(&mut self) -> Option<Value> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.inbound.try_recv().ok()
    }

    pub fn disconnect(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.events.send(TransportEvent::Disconnected {
            key: self.key.clone(),
            connection_id: self.id,
        });
    }
}

impl Connection for MemoryConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, message: Value) -> Result<(), TransportError> {
        MemoryConnection::send(self, message)
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

struct ChannelSink {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Value>,
}

impl Connection for ChannelSink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, message: Value) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_| TransportError::Closed(self.id))
    }
}
