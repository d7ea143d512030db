//! Ownership and wiring of per-peer links

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::media::LocalMedia;
use crate::peer::{PeerId, PeerLink};
use crate::roster::Roster;
use crate::rtc::{CandidateCallback, RemoteTrack, RemoteTrackCallback, TransportFactory};
use crate::signaling::{ClientSignal, SignalChannel};
use crate::surface::SurfaceRegistry;
use crate::{Error, Result};

/// Inbound tracks expected per peer before it becomes visible: one audio +
/// one video
const TRACKS_PER_PEER: u32 = 2;

/// Owns the map from peer identifier to [`PeerLink`]
///
/// Creates links on first contact and tears them down on departure. Link
/// creation wires the transport's callbacks: discovered local candidates are
/// relayed to the peer through the signal channel, and inbound tracks are
/// counted until the peer is complete enough to enter the roster and reach
/// its display surface.
pub struct LinkRegistry {
    links: RwLock<HashMap<PeerId, Arc<PeerLink>>>,
    factory: Arc<dyn TransportFactory>,
    channel: Arc<dyn SignalChannel>,
    roster: Roster,
    surfaces: SurfaceRegistry,
}

impl LinkRegistry {
    /// Create an empty registry over the given capabilities
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        channel: Arc<dyn SignalChannel>,
        roster: Roster,
        surfaces: SurfaceRegistry,
    ) -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
            factory,
            channel,
            roster,
            surfaces,
        }
    }

    /// Create and wire a link for `peer_id`
    ///
    /// Opens a transport, registers the candidate and track callbacks,
    /// attaches every local track, and stores the link. Fails with
    /// [`Error::DuplicatePeer`] when a link for `peer_id` already exists;
    /// the existing link is left untouched.
    pub async fn ensure_link(
        &self,
        peer_id: PeerId,
        media: &dyn LocalMedia,
    ) -> Result<Arc<PeerLink>> {
        if self.links.read().await.contains_key(&peer_id) {
            return Err(Error::DuplicatePeer(peer_id.to_string()));
        }

        let transport = self.factory.open(&peer_id).await?;
        let link = Arc::new(PeerLink::new(peer_id.clone(), Arc::clone(&transport)));

        transport.on_local_candidate(self.candidate_callback(peer_id.clone()));
        transport.on_remote_track(self.track_callback(peer_id.clone(), &link));

        for track in media.tracks() {
            if let Err(e) = transport.attach_track(&track).await {
                if let Err(close_err) = transport.close().await {
                    warn!(peer = %peer_id, "Failed to close half-wired transport: {}", close_err);
                }
                return Err(e);
            }
        }

        let mut links = self.links.write().await;
        if links.contains_key(&peer_id) {
            drop(links);
            if let Err(e) = transport.close().await {
                warn!(peer = %peer_id, "Failed to close transport for duplicate link: {}", e);
            }
            return Err(Error::DuplicatePeer(peer_id.to_string()));
        }
        links.insert(peer_id.clone(), Arc::clone(&link));
        debug!(peer = %peer_id, links = links.len(), "peer link created");
        Ok(link)
    }

    /// Tear down the link for `peer_id`
    ///
    /// Closes the transport, drops the display-surface binding and removes
    /// the peer from the roster. A missing link is a silent no-op.
    pub async fn release(&self, peer_id: &PeerId) {
        let removed = self.links.write().await.remove(peer_id);
        match removed {
            Some(link) => {
                if let Err(e) = link.close().await {
                    warn!(peer = %peer_id, "Error closing peer transport: {}", e);
                }
                self.surfaces.release(peer_id);
                self.roster.remove(peer_id);
                debug!(peer = %peer_id, "peer link released");
            }
            None => debug!(peer = %peer_id, "release for unknown peer, ignoring"),
        }
    }

    /// Tear down every remaining link
    pub async fn release_all(&self) {
        let drained: Vec<(PeerId, Arc<PeerLink>)> =
            self.links.write().await.drain().collect();
        for (peer_id, link) in drained {
            if let Err(e) = link.close().await {
                warn!(peer = %peer_id, "Error closing peer transport: {}", e);
            }
            self.surfaces.release(&peer_id);
            self.roster.remove(&peer_id);
        }
    }

    /// Look up the link for `peer_id`
    pub async fn get(&self, peer_id: &PeerId) -> Option<Arc<PeerLink>> {
        self.links.read().await.get(peer_id).cloned()
    }

    /// Whether a link exists for `peer_id`
    pub async fn contains(&self, peer_id: &PeerId) -> bool {
        self.links.read().await.contains_key(peer_id)
    }

    /// Number of live links
    pub async fn len(&self) -> usize {
        self.links.read().await.len()
    }

    /// True when no links are live
    pub async fn is_empty(&self) -> bool {
        self.links.read().await.is_empty()
    }

    fn candidate_callback(&self, peer_id: PeerId) -> CandidateCallback {
        let channel = Arc::clone(&self.channel);
        Box::new(move |candidate| {
            let channel = Arc::clone(&channel);
            let peer_id = peer_id.clone();
            tokio::spawn(async move {
                let signal = ClientSignal::RelayIce {
                    peer_id: peer_id.clone(),
                    ice_candidate: candidate,
                };
                if let Err(e) = channel.emit(signal).await {
                    warn!(peer = %peer_id, "Failed to relay ICE candidate: {}", e);
                }
            });
        })
    }

    fn track_callback(&self, peer_id: PeerId, link: &Arc<PeerLink>) -> RemoteTrackCallback {
        let roster = self.roster.clone();
        let surfaces = self.surfaces.clone();
        // The transport retains this callback; a Weak link reference keeps
        // release() able to drop the link (and makes post-release arrivals
        // stale no-ops).
        let link = Arc::downgrade(link);
        Box::new(move |remote: RemoteTrack| {
            let Some(link) = link.upgrade() else {
                debug!(peer = %peer_id, "track arrived after link release, ignoring");
                return;
            };
            let count = link.record_inbound_track();
            debug!(peer = %peer_id, kind = %remote.kind, count, "inbound track");
            if count == TRACKS_PER_PEER {
                let surfaces = surfaces.clone();
                let stream = remote.stream.clone();
                let bind_peer = peer_id.clone();
                roster.add_if_absent(
                    peer_id.clone(),
                    Some(Box::new(move |_| {
                        surfaces.deliver(&bind_peer, stream);
                    })),
                );
            }
        })
    }
}
