//! Mesh-topology WebRTC conference orchestration
//!
//! This crate runs the client side of a small group call: every participant
//! keeps one peer connection per remote participant (full mesh) and a
//! lightweight relay server only forwards signaling messages between them.
//!
//! # Features
//!
//! - **Mesh peer management**: one negotiated link per remote peer, created
//!   and torn down from server `add_peer` / `remove_peer` signals
//! - **Serial signaling dispatch**: all inbound signals are applied in wire
//!   order by a single task, so negotiation never races itself
//! - **Offer/answer state machine**: per-link negotiation roles with stale
//!   and out-of-order descriptions dropped instead of crashing the call
//! - **Roster publication**: a `watch` channel publishes the participant
//!   list (local sentinel first) after each change is applied
//! - **Display surfaces**: streams are routed to embedder-bound sinks the
//!   moment a peer's media becomes complete
//! - **Swappable drivers**: signaling, capture and transport sit behind
//!   traits; webrtc-rs and tokio-tungstenite implementations are included
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  SessionController (join / leave)                        │
//! │  ├─ WsSignalChannel (JSON over WebSocket)                │
//! │  ├─ SignalingDispatcher (serial inbound signal loop)     │
//! │  │    └─ LinkRegistry (mesh of PeerLinks)                │
//! │  │         └─ PeerLink (offer/answer state machine)      │
//! │  │              └─ PeerTransport (webrtc-rs)             │
//! │  ├─ Roster (watch-published participant list)            │
//! │  └─ SurfaceRegistry (stream → DisplaySurface routing)    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use meshcall::SessionConfig;
//!
//! let config = SessionConfig::default()
//!     .with_signaling_url("wss://calls.example.com/signaling");
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Async Usage
//!
//! ```no_run
//! use meshcall::{SessionConfig, SessionController};
//!
//! # async fn example() -> meshcall::Result<()> {
//! let session = SessionController::connect(SessionConfig::default()).await?;
//! session.join("standup").await?;
//!
//! let mut roster = session.roster_updates();
//! while roster.changed().await.is_ok() {
//!     println!("participants: {:?}", *roster.borrow());
//! }
//!
//! session.leave().await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

// Public modules
pub mod config;
pub mod error;
pub mod media;
pub mod rtc;
pub mod signaling;
pub mod surface;

// Internal modules
mod dispatch;
mod peer;
mod roster;
mod session;

// Re-exports for public API
pub use config::{CaptureProfile, IceServerConfig, SessionConfig, VideoProfile};
pub use error::{Error, Result};
pub use media::{LocalMedia, LocalTrack, MediaSource, TrackKind};
pub use peer::PeerId;
pub use roster::{AppliedCallback, Roster};
pub use session::SessionController;
pub use signaling::{
    ClientSignal, IceCandidate, SdpKind, ServerSignal, SessionDescription, SignalChannel,
};
pub use surface::{DisplaySurface, StreamHandle};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
