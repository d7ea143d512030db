//! Scripted capability doubles for driving a whole session offline
//!
//! Every seam the session depends on (signaling, capture, transport,
//! display) gets a recording fake here, so scenario tests can play both
//! sides of the wire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use meshcall::rtc::{
    CandidateCallback, PeerTransport, RemoteTrack, RemoteTrackCallback, TransportFactory,
};
use meshcall::signaling::SignalChannel;
use meshcall::{
    CaptureProfile, ClientSignal, DisplaySurface, Error, IceCandidate, LocalMedia, LocalTrack,
    MediaSource, PeerId, Result, ServerSignal, SessionConfig, SessionController,
    SessionDescription, StreamHandle, TrackKind,
};

/// Signaling channel double: records emissions, lets the test inject
/// inbound server signals
#[derive(Default)]
pub struct ScriptChannel {
    emitted: Mutex<Vec<ClientSignal>>,
    inbound: Mutex<Option<mpsc::UnboundedSender<ServerSignal>>>,
}

impl ScriptChannel {
    pub fn emitted(&self) -> Vec<ClientSignal> {
        self.emitted.lock().unwrap().clone()
    }

    /// Play one signal from the server side
    pub fn push(&self, signal: ServerSignal) {
        self.inbound
            .lock()
            .unwrap()
            .as_ref()
            .expect("session has not subscribed")
            .send(signal)
            .expect("dispatcher gone");
    }
}

#[async_trait]
impl SignalChannel for ScriptChannel {
    async fn emit(&self, signal: ClientSignal) -> Result<()> {
        self.emitted.lock().unwrap().push(signal);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inbound.lock().unwrap() = Some(tx);
        rx
    }
}

/// Transport double with triggerable candidate and track events
pub struct FakeTransport {
    peer_id: PeerId,
    stream: StreamHandle,
    candidate_cb: Mutex<Option<CandidateCallback>>,
    track_cb: Mutex<Option<RemoteTrackCallback>>,
    pub attached: Mutex<Vec<TrackKind>>,
    pub remote_descriptions: Mutex<Vec<SessionDescription>>,
    pub remote_candidates: Mutex<Vec<IceCandidate>>,
    pub closed: AtomicBool,
}

impl FakeTransport {
    fn new(peer_id: PeerId) -> Self {
        // String payload keyed by peer so tests can identify the stream a
        // surface received
        let stream = StreamHandle::new(format!("stream-{}", peer_id));
        Self {
            peer_id,
            stream,
            candidate_cb: Mutex::new(None),
            track_cb: Mutex::new(None),
            attached: Mutex::new(Vec::new()),
            remote_descriptions: Mutex::new(Vec::new()),
            remote_candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulate local ICE discovery
    pub fn fire_candidate(&self, candidate: IceCandidate) {
        let guard = self.candidate_cb.lock().unwrap();
        guard.as_ref().expect("no candidate callback")(candidate);
    }

    /// Simulate one remote track arrival
    pub fn fire_track(&self, kind: TrackKind) {
        let track = RemoteTrack {
            kind,
            stream: self.stream.clone(),
        };
        let guard = self.track_cb.lock().unwrap();
        guard.as_ref().expect("no track callback")(track);
    }

    /// Simulate the full audio + video arrival that completes a peer
    pub fn fire_media(&self) {
        self.fire_track(TrackKind::Audio);
        self.fire_track(TrackKind::Video);
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    fn on_local_candidate(&self, callback: CandidateCallback) {
        *self.candidate_cb.lock().unwrap() = Some(callback);
    }

    fn on_remote_track(&self, callback: RemoteTrackCallback) {
        *self.track_cb.lock().unwrap() = Some(callback);
    }

    async fn attach_track(&self, track: &LocalTrack) -> Result<()> {
        self.attached.lock().unwrap().push(track.kind());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::offer(format!(
            "v=0 offer-for-{}",
            self.peer_id
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::answer(format!(
            "v=0 answer-for-{}",
            self.peer_id
        )))
    }

    async fn set_local_description(&self, _description: SessionDescription) -> Result<()> {
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.remote_descriptions.lock().unwrap().push(description);
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.remote_candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory double keeping every opened transport inspectable
#[derive(Default)]
pub struct FakeFactory {
    transports: Mutex<HashMap<PeerId, Arc<FakeTransport>>>,
}

impl FakeFactory {
    pub fn transport(&self, peer_id: &PeerId) -> Arc<FakeTransport> {
        self.transports
            .lock()
            .unwrap()
            .get(peer_id)
            .cloned()
            .expect("no transport opened for peer")
    }

    pub fn opened(&self) -> usize {
        self.transports.lock().unwrap().len()
    }
}

#[async_trait]
impl TransportFactory for FakeFactory {
    async fn open(&self, peer_id: &PeerId) -> Result<Arc<dyn PeerTransport>> {
        let transport = Arc::new(FakeTransport::new(peer_id.clone()));
        self.transports
            .lock()
            .unwrap()
            .insert(peer_id.clone(), Arc::clone(&transport));
        Ok(transport)
    }
}

/// Captured-media double
#[derive(Default)]
pub struct FakeMedia {
    pub stopped: AtomicBool,
}

impl LocalMedia for FakeMedia {
    fn tracks(&self) -> Vec<LocalTrack> {
        vec![
            LocalTrack::new(TrackKind::Audio, "mic".to_string()),
            LocalTrack::new(TrackKind::Video, "cam".to_string()),
        ]
    }

    fn stream(&self) -> StreamHandle {
        StreamHandle::new("local-preview".to_string())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Media source double; set `deny` to make capture fail like a user
/// rejecting the permission prompt
#[derive(Default)]
pub struct FakeMediaSource {
    pub deny: AtomicBool,
    captured: Mutex<Vec<Arc<FakeMedia>>>,
}

impl FakeMediaSource {
    pub fn captured(&self) -> Vec<Arc<FakeMedia>> {
        self.captured.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSource for FakeMediaSource {
    async fn capture(&self, _profile: &CaptureProfile) -> Result<Arc<dyn LocalMedia>> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(Error::MediaAcquisitionError(
                "permission denied".to_string(),
            ));
        }
        let media = Arc::new(FakeMedia::default());
        self.captured.lock().unwrap().push(Arc::clone(&media));
        Ok(media)
    }
}

/// Display surface double recording every attach payload
#[derive(Default)]
pub struct RecordingSurface {
    attached: Mutex<Vec<StreamHandle>>,
    pub detaches: AtomicUsize,
}

impl RecordingSurface {
    pub fn attach_count(&self) -> usize {
        self.attached.lock().unwrap().len()
    }

    /// String payload of the most recently attached stream
    pub fn last_stream(&self) -> Option<String> {
        self.attached
            .lock()
            .unwrap()
            .last()
            .and_then(|handle| handle.downcast_ref::<String>().cloned())
    }
}

impl DisplaySurface for RecordingSurface {
    fn attach(&self, stream: StreamHandle) {
        self.attached.lock().unwrap().push(stream);
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }
}

/// A session wired entirely to doubles
pub struct Harness {
    pub session: SessionController,
    pub channel: Arc<ScriptChannel>,
    pub factory: Arc<FakeFactory>,
    pub source: Arc<FakeMediaSource>,
}

pub fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("meshcall=debug")
        .try_init();

    let channel = Arc::new(ScriptChannel::default());
    let factory = Arc::new(FakeFactory::default());
    let source = Arc::new(FakeMediaSource::default());
    let session = SessionController::new(
        SessionConfig::default(),
        channel.clone(),
        source.clone(),
        factory.clone(),
    )
    .expect("default config is valid");

    Harness {
        session,
        channel,
        factory,
        source,
    }
}

/// Let the dispatcher task drain everything pushed so far
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
