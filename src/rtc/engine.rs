//! webrtc-rs drivers for the transport and media capabilities

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::media::Sample;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::config::{CaptureProfile, IceServerConfig};
use crate::media::{LocalMedia, LocalTrack, MediaSource, TrackKind};
use crate::peer::PeerId;
use crate::rtc::{
    CandidateCallback, PeerTransport, RemoteTrack, RemoteTrackCallback, TransportFactory,
};
use crate::signaling::{IceCandidate, SdpKind, SessionDescription};
use crate::surface::StreamHandle;
use crate::{Error, Result};

/// Opens webrtc-rs peer connections configured from the ICE server list
pub struct RtcTransportFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl RtcTransportFactory {
    /// Create a factory for the given ICE servers
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn open(&self, peer_id: &PeerId) -> Result<Arc<dyn PeerTransport>> {
        info!(peer = %peer_id, "Creating peer connection");

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::WebRtcError(format!("Failed to register codecs: {}", e)))?;

        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine).map_err(|e| {
                Error::WebRtcError(format!("Failed to register interceptors: {}", e))
            })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        let ice_servers: Vec<RTCIceServer> = self
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone(),
                credential: server.credential.clone(),
                ..Default::default()
            })
            .collect();

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await.map_err(|e| {
            Error::WebRtcError(format!("Failed to create peer connection: {}", e))
        })?);

        Ok(Arc::new(RtcTransport::new(peer_id.clone(), peer_connection)))
    }
}

/// Remote media arriving from one peer
///
/// Collects the peer's remote tracks as they arrive; the wrapping
/// [`StreamHandle`] is created once per transport, so every track event for a
/// peer carries a handle to the same bundle.
pub struct RtcRemoteStream {
    peer_id: PeerId,
    tracks: Mutex<Vec<Arc<TrackRemote>>>,
}

impl RtcRemoteStream {
    fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            tracks: Mutex::new(Vec::new()),
        }
    }

    /// The peer this stream belongs to
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Snapshot of the tracks received so far
    pub fn tracks(&self) -> Vec<Arc<TrackRemote>> {
        self.tracks.lock().unwrap().clone()
    }

    fn push(&self, track: Arc<TrackRemote>) {
        self.tracks.lock().unwrap().push(track);
    }
}

/// [`PeerTransport`] over a webrtc-rs [`RTCPeerConnection`]
pub struct RtcTransport {
    peer_id: PeerId,
    peer_connection: Arc<RTCPeerConnection>,

    /// Shared remote-stream bundle handed to every track callback
    stream: StreamHandle,

    /// RTP senders retained so the attached tracks stay live
    senders: Mutex<Vec<Arc<RTCRtpSender>>>,

    closed: AtomicBool,
}

impl RtcTransport {
    fn new(peer_id: PeerId, peer_connection: Arc<RTCPeerConnection>) -> Self {
        let stream = StreamHandle::new(RtcRemoteStream::new(peer_id.clone()));
        Self {
            peer_id,
            peer_connection,
            stream,
            senders: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
        let kind = description.kind;
        let result = match kind {
            SdpKind::Offer => RTCSessionDescription::offer(description.sdp),
            SdpKind::Answer => RTCSessionDescription::answer(description.sdp),
        };
        result.map_err(|e| Error::NegotiationError(format!("Malformed {} description: {}", kind, e)))
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    fn on_local_candidate(&self, callback: CandidateCallback) {
        self.peer_connection
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                if let Some(candidate) = candidate {
                    match candidate.to_json() {
                        Ok(init) => callback(IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_mline_index: init.sdp_mline_index,
                        }),
                        Err(e) => warn!("Failed to encode local candidate: {}", e),
                    }
                }
                Box::pin(async {})
            }));
    }

    fn on_remote_track(&self, callback: RemoteTrackCallback) {
        let stream = self.stream.clone();
        let peer_id = self.peer_id.clone();
        self.peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    _ => TrackKind::Video,
                };
                debug!(peer = %peer_id, kind = %kind, ssrc = track.ssrc(), "remote track arrived");

                if let Some(bundle) = stream.downcast_ref::<RtcRemoteStream>() {
                    bundle.push(Arc::clone(&track));
                }
                callback(RemoteTrack {
                    kind,
                    stream: stream.clone(),
                });
                Box::pin(async {})
            },
        ));
    }

    async fn attach_track(&self, track: &LocalTrack) -> Result<()> {
        let Some(sample_track) = track.downcast_ref::<Arc<TrackLocalStaticSample>>() else {
            return Err(Error::MediaTrackError(format!(
                "Unsupported handle for {} track",
                track.kind()
            )));
        };

        let sender = self
            .peer_connection
            .add_track(Arc::clone(sample_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| {
                Error::MediaTrackError(format!("Failed to add {} track: {}", track.kind(), e))
            })?;

        self.senders.lock().unwrap().push(sender);
        debug!(peer = %self.peer_id, kind = %track.kind(), "local track attached");
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| Error::NegotiationError(format!("Failed to create offer: {}", e)))?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| Error::NegotiationError(format!("Failed to create answer: {}", e)))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let description = Self::to_rtc_description(description)?;
        self.peer_connection
            .set_local_description(description)
            .await
            .map_err(|e| {
                Error::NegotiationError(format!("Failed to set local description: {}", e))
            })
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let description = Self::to_rtc_description(description)?;
        self.peer_connection
            .set_remote_description(description)
            .await
            .map_err(|e| {
                Error::NegotiationError(format!("Failed to set remote description: {}", e))
            })
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: None,
        };

        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| Error::NegotiationError(format!("Failed to add ICE candidate: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!(peer = %self.peer_id, "Closing peer connection");
        self.peer_connection
            .close()
            .await
            .map_err(|e| Error::WebRtcError(format!("Failed to close peer connection: {}", e)))
    }
}

/// [`MediaSource`] building webrtc-rs sample tracks
///
/// The tracks carry whatever encoded samples the embedding application writes
/// through [`RtcLocalMedia::write_audio`] / [`RtcLocalMedia::write_video`];
/// device capture and encoding stay outside this crate.
#[derive(Debug, Default, Clone)]
pub struct RtcMediaSource;

impl RtcMediaSource {
    /// Create a media source
    pub fn new() -> Self {
        Self
    }

    /// Capture returning the concrete media type, for callers that feed samples
    pub async fn capture_rtc(&self, profile: &CaptureProfile) -> Result<Arc<RtcLocalMedia>> {
        if !profile.audio && profile.video.is_none() {
            return Err(Error::MediaAcquisitionError(
                "Capture profile enables no media kinds".to_string(),
            ));
        }

        let stream_id = format!("meshcall-{}", uuid::Uuid::new_v4());

        let audio = profile.audio.then(|| {
            Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: "audio/opus".to_string(),
                    clock_rate: 48000,
                    channels: 2,
                    sdp_fmtp_line: String::new(),
                    rtcp_feedback: vec![],
                },
                format!("audio-{}", uuid::Uuid::new_v4()),
                stream_id.clone(),
            ))
        });

        let video = profile.video.as_ref().map(|v| {
            debug!(width = v.width, height = v.height, "video capture profile");
            Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: "video/VP8".to_string(),
                    clock_rate: 90000,
                    channels: 0,
                    sdp_fmtp_line: String::new(),
                    rtcp_feedback: vec![],
                },
                format!("video-{}", uuid::Uuid::new_v4()),
                stream_id.clone(),
            ))
        });

        let mut tracks = Vec::new();
        if let Some(track) = &audio {
            tracks.push(LocalTrack::new(TrackKind::Audio, Arc::clone(track)));
        }
        if let Some(track) = &video {
            tracks.push(LocalTrack::new(TrackKind::Video, Arc::clone(track)));
        }

        info!(
            audio = profile.audio,
            video = profile.video.is_some(),
            stream = %stream_id,
            "Local media captured"
        );

        Ok(Arc::new(RtcLocalMedia {
            audio,
            video,
            stream_id,
            preview: StreamHandle::new(tracks.clone()),
            tracks,
            stopped: AtomicBool::new(false),
        }))
    }
}

#[async_trait]
impl MediaSource for RtcMediaSource {
    async fn capture(&self, profile: &CaptureProfile) -> Result<Arc<dyn LocalMedia>> {
        let media = self.capture_rtc(profile).await?;
        Ok(media as Arc<dyn LocalMedia>)
    }
}

/// Locally captured media backed by webrtc-rs sample tracks
///
/// The preview stream handle wraps the `Vec<LocalTrack>` of this media, so a
/// local display driver downcasts to the track handles directly.
pub struct RtcLocalMedia {
    audio: Option<Arc<TrackLocalStaticSample>>,
    video: Option<Arc<TrackLocalStaticSample>>,
    stream_id: String,
    preview: StreamHandle,
    tracks: Vec<LocalTrack>,
    stopped: AtomicBool,
}

impl RtcLocalMedia {
    /// Shared stream id of the local tracks
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// The audio sample track, when captured
    pub fn audio_track(&self) -> Option<Arc<TrackLocalStaticSample>> {
        self.audio.clone()
    }

    /// The video sample track, when captured
    pub fn video_track(&self) -> Option<Arc<TrackLocalStaticSample>> {
        self.video.clone()
    }

    /// Write one encoded audio sample
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MediaTrackError`] when no audio was captured, the
    /// media is stopped, or the track rejects the sample.
    pub async fn write_audio(&self, data: Bytes, duration: Duration) -> Result<()> {
        let track = self
            .audio
            .as_ref()
            .ok_or_else(|| Error::MediaTrackError("No audio track captured".to_string()))?;
        self.write_sample(track, data, duration).await
    }

    /// Write one encoded video sample
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MediaTrackError`] when no video was captured, the
    /// media is stopped, or the track rejects the sample.
    pub async fn write_video(&self, data: Bytes, duration: Duration) -> Result<()> {
        let track = self
            .video
            .as_ref()
            .ok_or_else(|| Error::MediaTrackError("No video track captured".to_string()))?;
        self.write_sample(track, data, duration).await
    }

    async fn write_sample(
        &self,
        track: &TrackLocalStaticSample,
        data: Bytes,
        duration: Duration,
    ) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(Error::MediaTrackError("Local media stopped".to_string()));
        }

        track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::MediaTrackError(format!("Failed to write sample: {}", e)))
    }
}

impl std::fmt::Debug for RtcLocalMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RtcLocalMedia({})", self.stream_id)
    }
}

impl LocalMedia for RtcLocalMedia {
    fn tracks(&self) -> Vec<LocalTrack> {
        self.tracks.clone()
    }

    fn stream(&self) -> StreamHandle {
        self.preview.clone()
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(stream = %self.stream_id, "local media stopped");
        }
    }
}
