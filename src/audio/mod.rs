//! Audio module
//!
//! Platform seam for the shared audio session plus the cpal capture backend.

mod backend;
mod cpal_backend;
pub mod meter;
mod settings;

pub use backend::{AudioBackend, AudioError, CaptureSession};
pub use cpal_backend::{shared_session_active, shared_session_options, CpalBackend};
pub use settings::{
    CaptureSettings, Destination, Encoding, Quality, SessionCategory, SessionMode, SessionOptions,
};

#[cfg(test)]
pub use backend::{MockAudioBackend, MockCaptureSession};
