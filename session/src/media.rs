//! Media capture boundary.
//!
//! Display and microphone capture are platform facilities; the session only
//! needs to start them, mute them, and notice when they end (the user hit
//! the native "stop sharing" control, unplugged the mic).

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The user declined the capture permission prompt. Not an error state
    /// for the session: the operation is simply abandoned.
    #[error("capture permission denied")]
    AccessDenied,
    /// No capture device is available.
    #[error("no capture device: {0}")]
    NoDevice(String),
}

/// A live capture track (screen or microphone).
pub trait MediaTrack: Send {
    /// Whether the track is currently producing media.
    fn enabled(&self) -> bool;

    /// Mute or unmute without tearing the track down.
    fn set_enabled(&mut self, enabled: bool);

    /// Whether the track ended outside the session's control.
    fn ended(&self) -> bool;

    /// Stop capturing. Idempotent.
    fn stop(&mut self);
}

/// Source of capture tracks.
pub trait MediaSource: Send {
    /// Prompt for and begin display capture.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::AccessDenied`] if the user declines.
    fn capture_display(&mut self) -> Result<Box<dyn MediaTrack>, MediaError>;

    /// Begin microphone capture.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::AccessDenied`] if the user declines.
    fn capture_microphone(&mut self) -> Result<Box<dyn MediaTrack>, MediaError>;
}
