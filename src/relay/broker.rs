//! Routing, queuing and broadcast over registered endpoints.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::registry::{Endpoint, EndpointRegistry, EndpointState};
use super::role::{identify, ConnectMeta, EndpointKey, Role, RoutingTable};
use super::transport::{Connection, ConnectionId};
use super::RelayError;

/// Greeting sent to every endpoint as soon as it is registered.
pub const GREETING: &str = "Client connected to background";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Reject connections whose origin discriminator cannot be derived.
    pub require_discriminator: bool,
    /// Cap on each destination queue. Unbounded when unset.
    pub max_queue_len: Option<usize>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            require_discriminator: true,
            max_queue_len: None,
        }
    }
}

/// What happened to a relayed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Forwarded(EndpointKey),
    Queued { destination: EndpointKey, depth: usize },
}

/// Relays messages between paired endpoints of the same origin.
pub struct Broker {
    routes: RoutingTable,
    registry: EndpointRegistry,
    queues: HashMap<EndpointKey, VecDeque<Value>>,
    config: BrokerConfig,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self::with_routes(RoutingTable::default(), config)
    }

    pub fn with_routes(routes: RoutingTable, config: BrokerConfig) -> Self {
        Self {
            routes,
            registry: EndpointRegistry::new(),
            queues: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn state(&self, key: &EndpointKey) -> EndpointState {
        self.registry.state(key)
    }

    /// Number of messages waiting for `key` to connect.
    pub fn queued(&self, key: &EndpointKey) -> usize {
        self.queues.get(key).map_or(0, VecDeque::len)
    }

    /// Register `conn` under the identity derived from `name`, greet it and
    /// flush everything queued for it.
    ///
    /// A newer connection under an existing identity replaces the old one.
    pub fn connect(
        &mut self,
        conn: Arc<dyn Connection>,
        name: &str,
        meta: &ConnectMeta,
    ) -> Result<EndpointKey, RelayError> {
        let key = identify(name, meta, self.config.require_discriminator)?;

        let endpoint = Endpoint {
            key: key.clone(),
            conn: Arc::clone(&conn),
        };
        if let Some(previous) = self.registry.register(endpoint) {
            tracing::info!(
                endpoint = %key,
                previous = previous.connection_id(),
                connection = conn.id(),
                "Endpoint reconnected, replacing previous connection"
            );
        } else {
            tracing::info!(endpoint = %key, connection = conn.id(), "Endpoint connected");
        }

        if let Err(err) = conn.send(json!({ "info": GREETING, "name": name })) {
            tracing::warn!(endpoint = %key, error = %err, "Failed to greet endpoint");
        }

        self.flush(&key, conn.as_ref());
        Ok(key)
    }

    fn flush(&mut self, key: &EndpointKey, conn: &dyn Connection) {
        let Some(mut pending) = self.queues.remove(key) else {
            return;
        };

        let total = pending.len();
        while let Some(message) = pending.pop_front() {
            if let Err(err) = conn.send(message.clone()) {
                pending.push_front(message);
                tracing::warn!(
                    endpoint = %key,
                    delivered = total - pending.len(),
                    remaining = pending.len(),
                    error = %err,
                    "Queue flush interrupted"
                );
                self.queues.insert(key.clone(), pending);
                return;
            }
        }
        tracing::debug!(endpoint = %key, delivered = total, "Flushed queued messages");
    }

    /// Relay `message` from `source` to its paired endpoint of the same origin.
    ///
    /// When the destination is not connected, or the send fails, the message
    /// waits in the destination's queue. Anything already waiting there is
    /// flushed first, so a destination never sees messages out of order.
    pub fn on_message(&mut self, source: &EndpointKey, message: Value) -> Delivery {
        let destination = source.with_role(self.routes.destination(source.role));
        let message = tag_origin(message, source);

        let conn = self
            .registry
            .lookup(&destination)
            .map(|endpoint| Arc::clone(&endpoint.conn));
        if let Some(conn) = &conn {
            self.flush(&destination, conn.as_ref());
        }
        let conn = conn.filter(|_| self.queued(&destination) == 0);

        if let Some(conn) = conn {
            match conn.send(message.clone()) {
                Ok(()) => {
                    tracing::debug!(from = %source, to = %destination, "Relayed message");
                    return Delivery::Forwarded(destination);
                }
                Err(err) => {
                    tracing::warn!(
                        from = %source,
                        to = %destination,
                        error = %err,
                        "Relay failed, queuing message"
                    );
                }
            }
        }

        let depth = self.enqueue(&destination, message);
        tracing::debug!(from = %source, to = %destination, depth, "Queued message");
        Delivery::Queued { destination, depth }
    }

    fn enqueue(&mut self, destination: &EndpointKey, message: Value) -> usize {
        let queue = self.queues.entry(destination.clone()).or_default();
        queue.push_back(message);
        if let Some(max) = self.config.max_queue_len {
            while queue.len() > max {
                queue.pop_front();
                tracing::warn!(endpoint = %destination, max, "Queue full, dropped oldest message");
            }
        }
        queue.len()
    }

    /// Handle the loss of `connection_id` registered under `key`.
    ///
    /// Returns false when a newer connection already owns the identity, in
    /// which case nothing changes.
    pub fn disconnect(&mut self, key: &EndpointKey, connection_id: ConnectionId) -> bool {
        if self.registry.unregister(key, connection_id).is_none() {
            tracing::debug!(endpoint = %key, connection = connection_id, "Ignoring stale disconnect");
            return false;
        }
        tracing::info!(endpoint = %key, connection = connection_id, "Endpoint disconnected");

        let notice = json!({
            "state": "disconnected",
            "name": key.to_string(),
            "tabId": key.discriminator,
        });
        self.broadcast_from(key.discriminator.as_deref(), &notice);
        true
    }

    /// Best-effort delivery of `message` to one endpoint of every role.
    ///
    /// Returns how many endpoints accepted it. Failures are logged and dropped.
    pub fn broadcast(&self, message: &Value) -> usize {
        self.broadcast_from(None, message)
    }

    fn broadcast_from(&self, origin: Option<&str>, message: &Value) -> usize {
        let mut delivered = 0;
        for role in Role::ALL {
            let Some(endpoint) = self.registry.representative(role, origin) else {
                continue;
            };
            match endpoint.conn.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::debug!(endpoint = %endpoint.key, error = %err, "Broadcast not delivered");
                }
            }
        }
        delivered
    }

    /// Forget every endpoint and queued message.
    pub fn reset(&mut self) {
        let dropped: usize = self.queues.values().map(VecDeque::len).sum();
        self.queues.clear();
        self.registry.clear();
        tracing::info!(dropped, "Relay broker reset");
    }
}

fn tag_origin(message: Value, source: &EndpointKey) -> Value {
    match (message, &source.discriminator) {
        (Value::Object(mut map), Some(tab)) if !map.contains_key("tabId") => {
            map.insert("tabId".to_string(), Value::String(tab.clone()));
            Value::Object(map)
        }
        (message, _) => message,
    }
}
