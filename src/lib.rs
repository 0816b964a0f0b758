pub mod config;
pub mod control;
pub mod relay;
pub mod state;
pub mod timeline;
pub mod trace;
pub mod util;

pub use config::Config;
pub use control::{ControlError, ControlMessage, MessageEmitter, RuntimeBackend, StateSink};
pub use relay::{Broker, BrokerConfig, EndpointKey, MemoryTransport, RelayError, Role, Transport};
pub use state::{apply_delta, Delta, DeltaOp, KeyPath, Node};
pub use timeline::{apply_deltas, reconstruct_at, Message, MessageLog};
pub use trace::{deep_pick, merge_unique_paths, trace, DependencyTrace, PathSet, TransitionRegistry};
