//! Message relay between the page script and the inspector panel.
//!
//! Endpoints connect under a role name, optionally suffixed with an origin
//! discriminator. Messages are routed to the paired role of the same origin,
//! or queued per destination until that endpoint connects.

pub mod broker;
pub mod registry;
pub mod role;
pub mod transport;

use thiserror::Error;

pub use broker::{Broker, BrokerConfig, Delivery};
pub use registry::{Endpoint, EndpointRegistry, EndpointState};
pub use role::{identify, ConnectMeta, EndpointKey, Role, RoutingTable};
pub use transport::{
    BrokerService, Connection, ConnectionId, MemoryConnection, MemoryTransport, Transport,
    TransportError, TransportEvent,
};

/// Configuration errors raised while identifying or routing endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("No channel defined for sender: {0}")]
    NoChannel(String),

    #[error("Cannot derive an origin discriminator for connection: {0}")]
    NoDiscriminator(String),

    #[error("Routing table has no destination for role: {0}")]
    IncompleteRouting(Role),

    #[error("Broker is no longer running")]
    BrokerClosed,
}
