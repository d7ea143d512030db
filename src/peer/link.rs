//! Per-peer negotiation state machine

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::peer::PeerId;
use crate::rtc::PeerTransport;
use crate::signaling::{IceCandidate, SdpKind, SessionDescription};
use crate::{Error, Result};

/// Where a link stands in the offer/answer exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    /// Link created, no description exchanged yet
    Idle,
    /// Local offer emitted, waiting for the answer
    OfferSent,
    /// Remote offer applied, answer not yet created
    OfferReceived,
    /// Local answer emitted
    AnswerSent,
    /// Answer applied on the offering side; exchange complete
    Stable,
}

impl std::fmt::Display for NegotiationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NegotiationRole::Idle => "idle",
            NegotiationRole::OfferSent => "offer_sent",
            NegotiationRole::OfferReceived => "offer_received",
            NegotiationRole::AnswerSent => "answer_sent",
            NegotiationRole::Stable => "stable",
        };
        write!(f, "{}", name)
    }
}

/// One negotiated media connection to one remote peer
///
/// Owns the transport exclusively and serializes the offer/answer exchange
/// over it. Descriptions arriving out of order are rejected with
/// [`Error::NegotiationError`] before any transport call, leaving both the
/// role and the transport untouched.
pub struct PeerLink {
    peer_id: PeerId,
    transport: Arc<dyn PeerTransport>,
    role: Mutex<NegotiationRole>,
    received_tracks: AtomicU32,
}

impl PeerLink {
    /// Wrap a freshly opened transport
    pub fn new(peer_id: PeerId, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            peer_id,
            transport,
            role: Mutex::new(NegotiationRole::Idle),
            received_tracks: AtomicU32::new(0),
        }
    }

    /// The remote peer this link connects to
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// The underlying transport
    pub fn transport(&self) -> &Arc<dyn PeerTransport> {
        &self.transport
    }

    /// Current negotiation role
    pub fn role(&self) -> NegotiationRole {
        *self.role.lock().unwrap()
    }

    /// Number of inbound tracks seen so far
    pub fn received_tracks(&self) -> u32 {
        self.received_tracks.load(Ordering::SeqCst)
    }

    /// Record one inbound track arrival, returning the new count
    pub fn record_inbound_track(&self) -> u32 {
        self.received_tracks.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Create and apply a local offer
    ///
    /// Returns the offer for relaying to the peer. Role becomes
    /// [`NegotiationRole::OfferSent`].
    pub async fn make_offer(&self) -> Result<SessionDescription> {
        let offer = self.transport.create_offer().await?;
        self.transport.set_local_description(offer.clone()).await?;
        self.set_role(NegotiationRole::OfferSent);
        Ok(offer)
    }

    /// Apply a remote offer and produce the answer
    ///
    /// Valid when the role is `Idle` (initial exchange) or `Stable`
    /// (renegotiation). Returns the answer for relaying to the peer; role
    /// becomes [`NegotiationRole::AnswerSent`].
    pub async fn accept_offer(&self, description: SessionDescription) -> Result<SessionDescription> {
        if description.kind != SdpKind::Offer {
            return Err(Error::NegotiationError(format!(
                "expected an offer from {}, got {}",
                self.peer_id, description.kind
            )));
        }
        let role = self.role();
        if !matches!(role, NegotiationRole::Idle | NegotiationRole::Stable) {
            return Err(Error::NegotiationError(format!(
                "offer from {} out of order in role {}",
                self.peer_id, role
            )));
        }

        self.transport.set_remote_description(description).await?;
        self.set_role(NegotiationRole::OfferReceived);

        let answer = self.transport.create_answer().await?;
        self.transport.set_local_description(answer.clone()).await?;
        self.set_role(NegotiationRole::AnswerSent);
        Ok(answer)
    }

    /// Apply a remote answer
    ///
    /// Valid only in [`NegotiationRole::OfferSent`]; role becomes
    /// [`NegotiationRole::Stable`].
    pub async fn accept_answer(&self, description: SessionDescription) -> Result<()> {
        if description.kind != SdpKind::Answer {
            return Err(Error::NegotiationError(format!(
                "expected an answer from {}, got {}",
                self.peer_id, description.kind
            )));
        }
        let role = self.role();
        if role != NegotiationRole::OfferSent {
            return Err(Error::NegotiationError(format!(
                "answer from {} out of order in role {}",
                self.peer_id, role
            )));
        }

        self.transport.set_remote_description(description).await?;
        self.set_role(NegotiationRole::Stable);
        Ok(())
    }

    /// Add a remote ICE candidate to the transport
    pub async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.transport.add_remote_candidate(candidate).await
    }

    /// Close the underlying transport
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }

    fn set_role(&self, next: NegotiationRole) {
        let mut role = self.role.lock().unwrap();
        debug!(peer = %self.peer_id, from = %*role, to = %next, "negotiation role change");
        *role = next;
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerLink({})", self.peer_id)
    }
}
