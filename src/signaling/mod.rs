//! Signaling channel capability and wire protocol

mod channel;
mod protocol;
mod websocket;

pub use channel::SignalChannel;
pub use protocol::{ClientSignal, IceCandidate, SdpKind, ServerSignal, SessionDescription};
pub use websocket::WsSignalChannel;
