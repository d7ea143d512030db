//! Negotiable peer transport capability and its webrtc-rs drivers

mod engine;
mod transport;

pub use engine::{RtcLocalMedia, RtcMediaSource, RtcRemoteStream, RtcTransport, RtcTransportFactory};
pub use transport::{
    CandidateCallback, PeerTransport, RemoteTrack, RemoteTrackCallback, TransportFactory,
};
