//! Serial handler for inbound server signals
//!
//! All signals drain through one task, so handlers for a given subscription
//! run to completion in arrival order. Negotiation state transitions never
//! race each other, and an `add_peer` is always fully processed before the
//! candidates and descriptions that follow it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::media::LocalMedia;
use crate::peer::{LinkRegistry, PeerId};
use crate::signaling::{ClientSignal, IceCandidate, ServerSignal, SessionDescription, SignalChannel};

/// Routes each [`ServerSignal`] to its handler
///
/// A faulty signal never stops the loop: handler failures are logged and the
/// dispatcher moves on to the next signal. The loop ends when the signal
/// stream does.
pub struct SignalingDispatcher {
    registry: Arc<LinkRegistry>,
    media: Arc<dyn LocalMedia>,
    channel: Arc<dyn SignalChannel>,
}

impl SignalingDispatcher {
    /// Build a dispatcher over the session's capabilities
    pub fn new(
        registry: Arc<LinkRegistry>,
        media: Arc<dyn LocalMedia>,
        channel: Arc<dyn SignalChannel>,
    ) -> Self {
        Self {
            registry,
            media,
            channel,
        }
    }

    /// Drain `rx` until the signal stream ends
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<ServerSignal>) {
        while let Some(signal) = rx.recv().await {
            self.handle(signal).await;
        }
        debug!("signal stream ended, dispatcher stopping");
    }

    /// Process one signal to completion
    pub async fn handle(&self, signal: ServerSignal) {
        debug!(action = signal.action(), peer = %signal.peer_id(), "handling signal");
        match signal {
            ServerSignal::AddPeer {
                peer_id,
                create_offer,
            } => self.on_add_peer(peer_id, create_offer).await,
            ServerSignal::SessionDescription {
                peer_id,
                session_description,
            } => self.on_session_description(peer_id, session_description).await,
            ServerSignal::IceCandidate {
                peer_id,
                ice_candidate,
            } => self.on_ice_candidate(peer_id, ice_candidate).await,
            ServerSignal::RemovePeer { peer_id } => self.registry.release(&peer_id).await,
        }
    }

    async fn on_add_peer(&self, peer_id: PeerId, create_offer: bool) {
        let link = match self
            .registry
            .ensure_link(peer_id.clone(), self.media.as_ref())
            .await
        {
            Ok(link) => link,
            Err(e) if e.is_duplicate_peer() => {
                warn!(peer = %peer_id, "add_peer for already linked peer, ignoring");
                return;
            }
            Err(e) => {
                warn!(peer = %peer_id, "Failed to create peer link: {}", e);
                return;
            }
        };

        if create_offer {
            match link.make_offer().await {
                Ok(offer) => self.relay_sdp(peer_id, offer).await,
                Err(e) => warn!(peer = %peer_id, "Failed to create offer: {}", e),
            }
        }
    }

    async fn on_session_description(&self, peer_id: PeerId, description: SessionDescription) {
        let Some(link) = self.registry.get(&peer_id).await else {
            debug!(peer = %peer_id, "description for unknown peer, ignoring");
            return;
        };

        if description.kind.is_offer() {
            match link.accept_offer(description).await {
                Ok(answer) => self.relay_sdp(peer_id, answer).await,
                Err(e) => warn!(peer = %peer_id, "Failed to apply offer: {}", e),
            }
        } else if let Err(e) = link.accept_answer(description).await {
            warn!(peer = %peer_id, "Failed to apply answer: {}", e);
        }
    }

    async fn on_ice_candidate(&self, peer_id: PeerId, candidate: IceCandidate) {
        let Some(link) = self.registry.get(&peer_id).await else {
            debug!(peer = %peer_id, "candidate for unknown peer, ignoring");
            return;
        };

        if let Err(e) = link.add_remote_candidate(candidate).await {
            warn!(peer = %peer_id, "Failed to add remote candidate: {}", e);
        }
    }

    async fn relay_sdp(&self, peer_id: PeerId, description: SessionDescription) {
        let signal = ClientSignal::RelaySdp {
            peer_id: peer_id.clone(),
            session_description: description,
        };
        if let Err(e) = self.channel.emit(signal).await {
            warn!(peer = %peer_id, "Failed to relay session description: {}", e);
        }
    }
}
