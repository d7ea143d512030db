//! Local media capture capability

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CaptureProfile;
use crate::surface::StreamHandle;
use crate::Result;

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Microphone / audio track
    Audio,
    /// Camera / video track
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Opaque handle to one local outbound track
///
/// Drivers wrap their own track type; transports downcast it back when
/// attaching. The orchestration core only reads the kind.
#[derive(Clone)]
pub struct LocalTrack {
    kind: TrackKind,
    inner: Arc<dyn Any + Send + Sync>,
}

impl LocalTrack {
    /// Wrap a driver track object
    pub fn new<T: Any + Send + Sync>(kind: TrackKind, track: T) -> Self {
        Self {
            kind,
            inner: Arc::new(track),
        }
    }

    /// The track's media kind
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Borrow the wrapped object if it is a `T`
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalTrack({})", self.kind)
    }
}

/// The local participant's captured media
///
/// One handle is shared by every peer link for outbound track attachment;
/// the session stops it on leave.
pub trait LocalMedia: Send + Sync {
    /// Track handles to attach to each peer transport
    fn tracks(&self) -> Vec<LocalTrack>;

    /// Stream handle for local preview binding
    fn stream(&self) -> StreamHandle;

    /// Stop capture; all tracks end and further writes are rejected
    fn stop(&self);
}

/// Capability that acquires local media
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Capture local media according to `profile`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MediaAcquisitionError`](crate::Error) when capture is
    /// unavailable or permission is denied.
    async fn capture(&self, profile: &CaptureProfile) -> Result<Arc<dyn LocalMedia>>;
}
