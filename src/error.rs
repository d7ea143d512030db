//! Error types for mesh call orchestration

/// Result type alias using meshcall Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating a mesh session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Local media capture unavailable or denied
    #[error("Media acquisition failed: {0}")]
    MediaAcquisitionError(String),

    /// Add-peer signal received for a peer that is already linked
    #[error("Peer already linked: {0}")]
    DuplicatePeer(String),

    /// Signal referenced a peer with no live link
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    /// Offer/answer negotiation failed or arrived out of order
    #[error("Negotiation error: {0}")]
    NegotiationError(String),

    /// Signaling channel error
    #[error("Signaling error: {0}")]
    SignalingError(String),

    /// Session lifecycle misuse (e.g. joining twice)
    #[error("Session error: {0}")]
    SessionError(String),

    /// Media track error
    #[error("Media track error: {0}")]
    MediaTrackError(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// WebRTC library error
    #[error("WebRTC error: {0}")]
    WebRtcError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error references a peer that has already departed
    pub fn is_stale_peer(&self) -> bool {
        matches!(self, Error::PeerNotFound(_))
    }

    /// Check if this error is a duplicate add-peer signal
    pub fn is_duplicate_peer(&self) -> bool {
        matches!(self, Error::DuplicatePeer(_))
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }

    /// Check if this error is fatal to joining a room
    pub fn is_fatal_to_join(&self) -> bool {
        matches!(
            self,
            Error::MediaAcquisitionError(_)
                | Error::InvalidConfig(_)
                | Error::SessionError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MediaAcquisitionError("camera busy".to_string());
        assert_eq!(err.to_string(), "Media acquisition failed: camera busy");
    }

    #[test]
    fn test_error_is_stale_peer() {
        assert!(Error::PeerNotFound("p1".to_string()).is_stale_peer());
        assert!(!Error::DuplicatePeer("p1".to_string()).is_stale_peer());
    }

    #[test]
    fn test_error_is_duplicate_peer() {
        assert!(Error::DuplicatePeer("p1".to_string()).is_duplicate_peer());
        assert!(!Error::PeerNotFound("p1".to_string()).is_duplicate_peer());
    }

    #[test]
    fn test_error_is_config_error() {
        assert!(Error::InvalidConfig("bad url".to_string()).is_config_error());
        assert!(!Error::SignalingError("closed".to_string()).is_config_error());
    }

    #[test]
    fn test_error_is_fatal_to_join() {
        assert!(Error::MediaAcquisitionError("denied".to_string()).is_fatal_to_join());
        assert!(Error::SessionError("already joined".to_string()).is_fatal_to_join());
        assert!(!Error::PeerNotFound("p1".to_string()).is_fatal_to_join());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::IoError(_)));
    }
}
