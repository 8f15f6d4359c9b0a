//! Session and capture settings handed to the audio backend

/// How the process-wide audio session is shared with other audio users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCategory {
    /// Simultaneous playback and recording
    PlayAndRecord,
}

/// Signal-processing mode requested from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Minimal input processing, intended for level measurement
    Measurement,
}

/// Options applied to the shared audio session before capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub category: SessionCategory,
    pub mode: SessionMode,
    /// Route playback to the loudspeaker instead of the receiver
    pub default_to_speaker: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            category: SessionCategory::PlayAndRecord,
            mode: SessionMode::Measurement,
            default_to_speaker: true,
        }
    }
}

/// Capture encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Lossless PCM-class codec
    Lossless,
}

/// Encoder quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    High,
}

/// Where captured audio goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Samples are metered and dropped, nothing is persisted
    Discard,
}

/// Settings for a single capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub encoding: Encoding,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    pub quality: Quality,
    pub metering_enabled: bool,
    pub destination: Destination,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            encoding: Encoding::Lossless,
            sample_rate: 44100,
            channels: 1,
            quality: Quality::High,
            metering_enabled: true,
            destination: Destination::Discard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capture_settings_are_mono_44k_lossless_with_metering() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.encoding, Encoding::Lossless);
        assert_eq!(settings.sample_rate, 44100);
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.quality, Quality::High);
        assert!(settings.metering_enabled);
        assert_eq!(settings.destination, Destination::Discard);
    }

    #[test]
    fn default_session_is_play_and_record_measurement_on_speaker() {
        let options = SessionOptions::default();
        assert_eq!(options.category, SessionCategory::PlayAndRecord);
        assert_eq!(options.mode, SessionMode::Measurement);
        assert!(options.default_to_speaker);
    }
}
