//! Configuration types for mesh call sessions

use serde::{Deserialize, Serialize};

/// Main configuration for a [`SessionController`](crate::SessionController)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket signaling server URL (ws:// or wss://)
    pub signaling_url: String,

    /// ICE servers used when opening peer transports (at least one required)
    pub ice_servers: Vec<IceServerConfig>,

    /// Signaling connect timeout in seconds (default: 10)
    pub connect_timeout_secs: u64,

    /// Local capture profile (default: audio + 720p video)
    pub capture: CaptureProfile,
}

/// One ICE server entry (STUN or TURN)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    /// Server URLs (stun:, turn: or turns:)
    pub urls: Vec<String>,

    /// Username for TURN authentication (empty for STUN)
    #[serde(default)]
    pub username: String,

    /// Credential for TURN authentication (empty for STUN)
    #[serde(default)]
    pub credential: String,
}

/// What the local media capability should capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureProfile {
    /// Capture a microphone track (default: true)
    pub audio: bool,

    /// Capture a camera track at the given resolution (default: 720p)
    pub video: Option<VideoProfile>,
}

/// Requested camera resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoProfile {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,
}

impl IceServerConfig {
    /// STUN-only entry with a single URL
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: String::new(),
            credential: String::new(),
        }
    }

    /// TURN entry with credentials
    pub fn turn(url: &str, username: &str, credential: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: username.to_string(),
            credential: credential.to_string(),
        }
    }
}

impl CaptureProfile {
    /// Audio-only profile (no camera track)
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: None,
        }
    }
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            audio: true,
            video: Some(VideoProfile {
                width: 1280,
                height: 720,
            }),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://localhost:3001".to_string(),
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            connect_timeout_secs: 10,
            capture: CaptureProfile::default(),
        }
    }
}

impl SessionConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `signaling_url` is not a valid WebSocket URL
    /// - `ice_servers` is empty or contains an entry without URLs
    /// - `connect_timeout_secs` is zero
    /// - `capture` enables neither audio nor video, or requests a zero-sized frame
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if !self.signaling_url.starts_with("ws://") && !self.signaling_url.starts_with("wss://") {
            return Err(Error::InvalidConfig(format!(
                "signaling_url must start with ws:// or wss://, got {}",
                self.signaling_url
            )));
        }

        if self.ice_servers.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one ICE server is required".to_string(),
            ));
        }
        for server in &self.ice_servers {
            if server.urls.is_empty() {
                return Err(Error::InvalidConfig(
                    "ICE server entry has no URLs".to_string(),
                ));
            }
        }

        if self.connect_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "connect_timeout_secs must be non-zero".to_string(),
            ));
        }

        if !self.capture.audio && self.capture.video.is_none() {
            return Err(Error::InvalidConfig(
                "capture must enable audio, video or both".to_string(),
            ));
        }
        if let Some(video) = &self.capture.video {
            if video.width == 0 || video.height == 0 {
                return Err(Error::InvalidConfig(format!(
                    "capture video resolution must be non-zero, got {}x{}",
                    video.width, video.height
                )));
            }
        }

        Ok(())
    }

    /// Set the signaling server URL
    ///
    /// Useful for chaining off `Default`.
    pub fn with_signaling_url(mut self, url: &str) -> Self {
        self.signaling_url = url.to_string();
        self
    }

    /// Replace the ICE server list
    ///
    /// Useful for chaining off `Default`.
    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    /// Set the capture profile
    ///
    /// Useful for chaining off `Default`.
    pub fn with_capture(mut self, capture: CaptureProfile) -> Self {
        self.capture = capture;
        self
    }
}
