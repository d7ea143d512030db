//! Peer identity and per-peer connection state

mod link;
mod registry;

pub use link::{NegotiationRole, PeerLink};
pub use registry::LinkRegistry;

use serde::{Deserialize, Serialize};

/// Reserved identifier for the local participant's roster entry
const LOCAL_SENTINEL: &str = "@local";

/// Opaque identifier for one conference participant
///
/// Remote identifiers are assigned by the relay server and are stable for the
/// room session. [`PeerId::local`] is a reserved sentinel naming the local
/// participant in the roster and surface registry; it is never carried in a
/// signal. Serializes transparently as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap a server-assigned identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved local-participant sentinel
    pub fn local() -> Self {
        Self(LOCAL_SENTINEL.to_string())
    }

    /// True if this is the local-participant sentinel
    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_SENTINEL
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
