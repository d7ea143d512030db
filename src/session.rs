//! Top-level session lifecycle: join a room, run the call, leave

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::dispatch::SignalingDispatcher;
use crate::media::{LocalMedia, MediaSource};
use crate::peer::{LinkRegistry, PeerId};
use crate::roster::Roster;
use crate::rtc::{RtcMediaSource, RtcTransportFactory, TransportFactory};
use crate::signaling::{ClientSignal, SignalChannel, WsSignalChannel};
use crate::surface::{DisplaySurface, SurfaceRegistry};
use crate::{Error, Result};

/// State held while a room is joined
struct JoinedState {
    room: String,
    media: Arc<dyn LocalMedia>,
    dispatcher: JoinHandle<()>,
}

/// Orchestrates one conference session
///
/// Owns the roster, the link registry and the dispatcher task. Capabilities
/// are injected, so tests drive the whole session with scripted doubles and
/// production code uses [`SessionController::connect`] to wire the WebSocket
/// channel and webrtc-rs drivers from configuration.
pub struct SessionController {
    config: SessionConfig,
    channel: Arc<dyn SignalChannel>,
    media_source: Arc<dyn MediaSource>,
    roster: Roster,
    surfaces: SurfaceRegistry,
    registry: Arc<LinkRegistry>,
    joined: Mutex<Option<JoinedState>>,
}

impl SessionController {
    /// Build a controller over injected capabilities
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when `config` fails validation.
    pub fn new(
        config: SessionConfig,
        channel: Arc<dyn SignalChannel>,
        media_source: Arc<dyn MediaSource>,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let roster = Roster::new();
        let surfaces = SurfaceRegistry::new();
        let registry = Arc::new(LinkRegistry::new(
            factory,
            Arc::clone(&channel),
            roster.clone(),
            surfaces.clone(),
        ));

        Ok(Self {
            config,
            channel,
            media_source,
            roster,
            surfaces,
            registry,
            joined: Mutex::new(None),
        })
    }

    /// Build a controller with the production drivers
    ///
    /// Connects the WebSocket signaling channel and wires the webrtc-rs
    /// transport factory and media source from `config`.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let channel = Arc::new(WsSignalChannel::connect(&config).await?);
        let factory = Arc::new(RtcTransportFactory::new(config.ice_servers.clone()));
        Self::new(config, channel, Arc::new(RtcMediaSource::new()), factory)
    }

    /// Join `room`
    ///
    /// Captures local media, registers the local participant in the roster
    /// (delivering the preview stream to a bound local surface), starts the
    /// dispatcher over the inbound signal stream, and announces the join.
    ///
    /// # Errors
    ///
    /// [`Error::MediaAcquisitionError`] when capture fails (nothing is
    /// joined, no partial state remains); [`Error::SessionError`] when the
    /// session is already joined.
    pub async fn join(&self, room: &str) -> Result<()> {
        let mut joined = self.joined.lock().await;
        if joined.is_some() {
            return Err(Error::SessionError("Session already joined".to_string()));
        }

        let media = self.media_source.capture(&self.config.capture).await?;

        let surfaces = self.surfaces.clone();
        let preview = media.stream();
        self.roster.add_if_absent(
            PeerId::local(),
            Some(Box::new(move |_| {
                surfaces.deliver(&PeerId::local(), preview);
            })),
        );

        // The dispatcher must be listening before the join announcement goes
        // out, or the server's immediate add_peer burst would be dropped.
        let rx = self.channel.subscribe();
        let dispatcher = SignalingDispatcher::new(
            Arc::clone(&self.registry),
            Arc::clone(&media),
            Arc::clone(&self.channel),
        );
        let task = tokio::spawn(dispatcher.run(rx));

        let announce = ClientSignal::Join {
            room: room.to_string(),
        };
        if let Err(e) = self.channel.emit(announce).await {
            task.abort();
            media.stop();
            self.roster.remove(&PeerId::local());
            self.surfaces.release(&PeerId::local());
            return Err(e);
        }

        info!(room, "joined room");
        *joined = Some(JoinedState {
            room: room.to_string(),
            media,
            dispatcher: task,
        });
        Ok(())
    }

    /// Leave the current room
    ///
    /// Stops local media, announces the leave, stops the dispatcher and
    /// releases every peer link. Idempotent: without an active session this
    /// is a no-op, so calling it after a failed `join` is safe.
    pub async fn leave(&self) -> Result<()> {
        let mut joined = self.joined.lock().await;
        let Some(state) = joined.take() else {
            debug!("leave without active session, ignoring");
            return Ok(());
        };

        info!(room = %state.room, "leaving room");
        state.media.stop();

        if let Err(e) = self.channel.emit(ClientSignal::Leave).await {
            warn!("Failed to announce leave: {}", e);
        }

        // Stop the dispatcher before draining links so no new link can be
        // created while the registry empties.
        state.dispatcher.abort();
        self.registry.release_all().await;
        self.roster.remove(&PeerId::local());
        self.surfaces.release(&PeerId::local());
        Ok(())
    }

    /// Snapshot of the current roster
    pub fn roster(&self) -> Vec<PeerId> {
        self.roster.snapshot()
    }

    /// Subscribe to roster publications
    pub fn roster_updates(&self) -> watch::Receiver<Vec<PeerId>> {
        self.roster.subscribe()
    }

    /// Route `peer_id`'s stream to `surface`
    ///
    /// Safe to call before the peer's media has arrived; the stream is
    /// delivered as soon as it does. Use [`PeerId::local`] for the local
    /// preview.
    pub fn bind_surface(&self, peer_id: PeerId, surface: Arc<dyn DisplaySurface>) {
        self.surfaces.bind(peer_id, surface);
    }

    /// Drop the surface binding for `peer_id`
    pub fn unbind_surface(&self, peer_id: &PeerId) {
        self.surfaces.unbind(peer_id);
    }

    /// Whether a room is currently joined
    pub async fn is_joined(&self) -> bool {
        self.joined.lock().await.is_some()
    }

    /// The configuration this session runs with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionController")
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // leave() closes transports; Drop can only stop the dispatcher task.
        if let Ok(mut joined) = self.joined.try_lock() {
            if let Some(state) = joined.take() {
                state.dispatcher.abort();
            }
        }
    }
}
