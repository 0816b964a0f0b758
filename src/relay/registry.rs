use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;

use super::role::{EndpointKey, Role};
use super::transport::{Connection, ConnectionId};

/// Lifecycle of an endpoint identity.
///
/// `Disconnected` is not final: identities are reusable, and a later
/// connection under the same key moves it back to `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Unregistered,
    Connected,
    Disconnected,
}

/// A live connection registered under an endpoint key.
#[derive(Clone)]
pub struct Endpoint {
    pub key: EndpointKey,
    pub conn: Arc<dyn Connection>,
}

impl Endpoint {
    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("key", &self.key)
            .field("connection_id", &self.connection_id())
            .finish()
    }
}

/// Departed identities remembered for [`EndpointState::Disconnected`].
///
/// Past this many, the earliest departures are forgotten and report
/// [`EndpointState::Unregistered`] again.
pub const MAX_DEPARTED: usize = 1024;

/// Live connections by endpoint key.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    live: HashMap<EndpointKey, Endpoint>,
    /// In order of departure, oldest first.
    departed: IndexSet<EndpointKey>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint`, returning any endpoint it replaced under the same key.
    pub fn register(&mut self, endpoint: Endpoint) -> Option<Endpoint> {
        self.departed.shift_remove(&endpoint.key);
        self.live.insert(endpoint.key.clone(), endpoint)
    }

    pub fn lookup(&self, key: &EndpointKey) -> Option<&Endpoint> {
        self.live.get(key)
    }

    /// Remove the endpoint under `key` if it is still owned by `connection_id`.
    ///
    /// A stale disconnect for a connection that has since been replaced is ignored.
    pub fn unregister(&mut self, key: &EndpointKey, connection_id: ConnectionId) -> Option<Endpoint> {
        match self.live.get(key) {
            Some(endpoint) if endpoint.connection_id() == connection_id => {
                self.departed.insert(key.clone());
                while self.departed.len() > MAX_DEPARTED {
                    self.departed.shift_remove_index(0);
                }
                self.live.remove(key)
            }
            _ => None,
        }
    }

    pub fn state(&self, key: &EndpointKey) -> EndpointState {
        if self.live.contains_key(key) {
            EndpointState::Connected
        } else if self.departed.contains(key) {
            EndpointState::Disconnected
        } else {
            EndpointState::Unregistered
        }
    }

    /// One live endpoint for `role`, preferring the given discriminator.
    ///
    /// Falls back to the endpoint with the smallest key so the choice is stable.
    pub fn representative(&self, role: Role, prefer: Option<&str>) -> Option<&Endpoint> {
        let preferred = EndpointKey::new(role, prefer.map(str::to_string));
        self.live.get(&preferred).or_else(|| {
            self.live
                .values()
                .filter(|endpoint| endpoint.key.role == role)
                .min_by(|a, b| a.key.cmp(&b.key))
        })
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.departed.clear();
    }
}
