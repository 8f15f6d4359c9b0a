//! Sensor errors
//!
//! None of these reach the host: every one folds into a silence-floor
//! reading and is kept on the `Reading` for diagnostics.

use crate::audio::AudioError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("Audio session acquisition failed: {0}")]
    AcquisitionFailed(#[source] AudioError),

    #[error("Capture session creation failed: {0}")]
    CaptureCreationFailed(#[source] AudioError),

    #[error("Capture failed to start: {0}")]
    CaptureStartFailed(#[source] AudioError),

    #[error("Metering unavailable: no active capture session")]
    MeteringUnavailable,
}
