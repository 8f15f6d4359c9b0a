//! Platform seam for the shared audio session and capture sessions

use super::settings::{CaptureSettings, SessionOptions};
use thiserror::Error;

/// Audio platform errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("No audio input device found")]
    NoDevice,

    #[error("Audio session error: {0}")]
    SessionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Capture thread exited")]
    CaptureThreadGone,
}

/// An open microphone capture
///
/// Dropping a session must release the input device even if `stop` was
/// never called.
#[cfg_attr(test, mockall::automock)]
pub trait CaptureSession: Send {
    /// Start pulling audio from the input device
    fn record(&mut self) -> Result<(), AudioError>;

    /// Refresh the metering statistics from the audio captured so far
    fn update_meters(&mut self);

    /// Average power in dBFS for `channel`, as of the last `update_meters`
    fn average_power(&self, channel: usize) -> f32;

    /// Stop capture and release the input device
    fn stop(&mut self);
}

/// Access to the audio platform of the process
#[cfg_attr(test, mockall::automock)]
pub trait AudioBackend: Send + Sync {
    /// Apply category, mode and routing to the process-wide audio session
    fn configure_session(&self, options: &SessionOptions) -> Result<(), AudioError>;

    /// Activate the process-wide audio session
    fn activate_session(&self) -> Result<(), AudioError>;

    /// Open a capture session on the input device
    fn open_capture(&self, settings: &CaptureSettings)
        -> Result<Box<dyn CaptureSession>, AudioError>;

    /// Names of the available input devices
    fn list_devices(&self) -> Vec<String> {
        Vec::new()
    }
}
