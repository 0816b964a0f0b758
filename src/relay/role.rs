//! Endpoint roles, identities and the static routing table.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::RelayError;

/// The logical endpoints the broker knows how to route between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Script attached to the inspected page.
    PageScript,
    /// The inspector panel.
    Panel,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::PageScript, Role::Panel];

    /// Name used on the wire when a connection introduces itself.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::PageScript => "StateScopePageScript",
            Role::Panel => "StateScopePanel",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.wire_name() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Identity of one physical endpoint: a role plus an optional origin discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub role: Role,
    pub discriminator: Option<String>,
}

impl EndpointKey {
    pub fn new(role: Role, discriminator: Option<String>) -> Self {
        Self {
            role,
            discriminator,
        }
    }

    /// The key of the same origin under a different role.
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role,
            discriminator: self.discriminator.clone(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Some(d) => write!(f, "{}:{}", self.role, d),
            None => write!(f, "{}", self.role),
        }
    }
}

/// Metadata the transport knows about an incoming connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectMeta {
    /// Originating tab or session of the sender, if known.
    pub tab_id: Option<String>,
}

impl ConnectMeta {
    pub fn tab(tab_id: impl Into<String>) -> Self {
        Self {
            tab_id: Some(tab_id.into()),
        }
    }
}

/// Resolve the identity of a connection named `name`.
///
/// Names take the form `<role>` or `<role>:<discriminator>`. Without an
/// explicit discriminator the sender's tab is used.
pub fn identify(
    name: &str,
    meta: &ConnectMeta,
    require_discriminator: bool,
) -> Result<EndpointKey, RelayError> {
    let (logical, explicit) = match name.split_once(':') {
        Some((logical, disc)) if !disc.is_empty() => (logical, Some(disc.to_string())),
        Some((logical, _)) => (logical, None),
        None => (name, None),
    };

    let role = Role::from_wire_name(logical).ok_or_else(|| RelayError::NoChannel(name.to_string()))?;
    let discriminator = explicit.or_else(|| meta.tab_id.clone());

    if require_discriminator && discriminator.is_none() {
        return Err(RelayError::NoDiscriminator(name.to_string()));
    }

    Ok(EndpointKey::new(role, discriminator))
}

/// A total mapping from each role to the role its messages are relayed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<Role, Role>,
}

impl RoutingTable {
    /// Build a routing table, rejecting any that leaves a role without a destination.
    pub fn new(pairs: impl IntoIterator<Item = (Role, Role)>) -> Result<Self, RelayError> {
        let routes: HashMap<Role, Role> = pairs.into_iter().collect();
        if let Some(missing) = Role::ALL.into_iter().find(|role| !routes.contains_key(role)) {
            return Err(RelayError::IncompleteRouting(missing));
        }
        Ok(Self { routes })
    }

    pub fn destination(&self, source: Role) -> Role {
        // Completeness is checked in `new`.
        self.routes[&source]
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            routes: HashMap::from([
                (Role::PageScript, Role::Panel),
                (Role::Panel, Role::PageScript),
            ]),
        }
    }
}
