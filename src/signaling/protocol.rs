//! Signaling wire protocol types
//!
//! Signals are closed tagged unions carried as JSON text frames. The `action`
//! tag selects the variant; payload fields sit beside it. Dispatch is an
//! exhaustive `match`, so adding a signal kind is a compile-time event, not a
//! string comparison.

use serde::{Deserialize, Serialize};

use crate::peer::PeerId;

/// Which half of the offer/answer exchange a description is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    /// Offer created by the initiating side
    Offer,
    /// Answer created in response to an offer
    Answer,
}

impl SdpKind {
    /// True for [`SdpKind::Offer`]
    pub fn is_offer(&self) -> bool {
        matches!(self, SdpKind::Offer)
    }
}

impl std::fmt::Display for SdpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdpKind::Offer => write!(f, "offer"),
            SdpKind::Answer => write!(f, "answer"),
        }
    }
}

/// One negotiation artifact (offer or answer) with its SDP body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Offer or answer
    #[serde(rename = "type")]
    pub kind: SdpKind,

    /// Raw SDP text
    pub sdp: String,
}

impl SessionDescription {
    /// Build an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    /// Build an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A discovered network path descriptor, relayed opaquely between peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Candidate attribute line
    pub candidate: String,

    /// Media stream identification tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,

    /// Index of the media description the candidate belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
}

/// Signals received from the relay server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerSignal {
    /// A peer joined the room; `create_offer` tells this side whether it
    /// initiates the exchange
    AddPeer {
        /// Remote peer to link
        peer_id: PeerId,
        /// Whether the local side creates the offer
        create_offer: bool,
    },

    /// An offer or answer relayed from a peer
    SessionDescription {
        /// Originating peer
        peer_id: PeerId,
        /// The relayed description
        session_description: SessionDescription,
    },

    /// An ICE candidate relayed from a peer
    IceCandidate {
        /// Originating peer
        peer_id: PeerId,
        /// The relayed candidate
        ice_candidate: IceCandidate,
    },

    /// A peer left the room
    RemovePeer {
        /// Departed peer
        peer_id: PeerId,
    },
}

/// Signals emitted to the relay server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientSignal {
    /// Enter a room; sent once, after local media is ready
    Join {
        /// Room identifier
        room: String,
    },

    /// Exit the current room
    Leave,

    /// Forward a locally created offer/answer to a peer via the server
    RelaySdp {
        /// Destination peer
        peer_id: PeerId,
        /// The local description to relay
        session_description: SessionDescription,
    },

    /// Forward a discovered local ICE candidate to a peer via the server
    RelayIce {
        /// Destination peer
        peer_id: PeerId,
        /// The local candidate to relay
        ice_candidate: IceCandidate,
    },
}

impl ServerSignal {
    /// Parse a signal from a JSON text frame
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to deserialize server signal: {}", e))
        })
    }

    /// Convert the signal to a JSON text frame
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to serialize server signal: {}", e))
        })
    }

    /// The action tag, for logging
    pub fn action(&self) -> &'static str {
        match self {
            ServerSignal::AddPeer { .. } => "add_peer",
            ServerSignal::SessionDescription { .. } => "session_description",
            ServerSignal::IceCandidate { .. } => "ice_candidate",
            ServerSignal::RemovePeer { .. } => "remove_peer",
        }
    }

    /// The peer the signal refers to
    pub fn peer_id(&self) -> &PeerId {
        match self {
            ServerSignal::AddPeer { peer_id, .. }
            | ServerSignal::SessionDescription { peer_id, .. }
            | ServerSignal::IceCandidate { peer_id, .. }
            | ServerSignal::RemovePeer { peer_id } => peer_id,
        }
    }
}

impl ClientSignal {
    /// Convert the signal to a JSON text frame
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to serialize client signal: {}", e))
        })
    }

    /// Parse a signal from a JSON text frame
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to deserialize client signal: {}", e))
        })
    }

    /// The action tag, for logging
    pub fn action(&self) -> &'static str {
        match self {
            ClientSignal::Join { .. } => "join",
            ClientSignal::Leave => "leave",
            ClientSignal::RelaySdp { .. } => "relay_sdp",
            ClientSignal::RelayIce { .. } => "relay_ice",
        }
    }
}
