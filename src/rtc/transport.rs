//! Capability traits for the per-peer media transport
//!
//! A [`PeerTransport`] is one negotiable, track-carrying connection to one
//! remote peer. The orchestration core drives it exclusively through this
//! trait, so tests substitute scripted transports and the production driver
//! ([`RtcTransport`](crate::rtc::RtcTransport)) stays swappable.

use std::sync::Arc;

use async_trait::async_trait;

use crate::media::{LocalTrack, TrackKind};
use crate::peer::PeerId;
use crate::signaling::{IceCandidate, SessionDescription};
use crate::surface::StreamHandle;
use crate::Result;

/// Callback invoked for each locally discovered ICE candidate
pub type CandidateCallback = Box<dyn Fn(IceCandidate) + Send + Sync>;

/// Callback invoked for each remote track arrival
pub type RemoteTrackCallback = Box<dyn Fn(RemoteTrack) + Send + Sync>;

/// One inbound track surfaced by a transport
///
/// The stream handle is stable per peer: every arrival for the same peer
/// carries a handle to the same underlying stream, so delivering any of them
/// to a display surface is equivalent.
#[derive(Clone)]
pub struct RemoteTrack {
    /// Media kind of the arrived track
    pub kind: TrackKind,
    /// The peer's stream, including this track
    pub stream: StreamHandle,
}

/// A negotiable, track-carrying connection to one remote peer
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Register the local-candidate callback
    ///
    /// Must be registered before negotiation starts; candidates discovered
    /// earlier may be missed.
    fn on_local_candidate(&self, callback: CandidateCallback);

    /// Register the remote-track callback
    fn on_remote_track(&self, callback: RemoteTrackCallback);

    /// Attach a local outbound track
    async fn attach_track(&self, track: &LocalTrack) -> Result<()>;

    /// Create an offer description
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Create an answer description (valid once a remote offer is applied)
    async fn create_answer(&self) -> Result<SessionDescription>;

    /// Apply a locally created description
    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    /// Apply a description received from the peer
    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    /// Add a remote ICE candidate
    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Close the connection; repeated calls are a no-op
    async fn close(&self) -> Result<()>;
}

/// Capability that opens fresh peer transports
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Open a new transport for `peer_id`
    async fn open(&self, peer_id: &PeerId) -> Result<Arc<dyn PeerTransport>>;
}
