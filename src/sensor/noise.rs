//! Ambient noise measurement
//!
//! Each `measure()` acquires the shared audio session, opens its own capture,
//! samples channel 0 and releases the capture before returning. Nothing
//! survives from one call to the next.

use super::error::SensorError;
use super::spl::{to_spl, SILENCE_FLOOR_DB};
use crate::audio::meter::clamp_power;
use crate::audio::{AudioBackend, CaptureSession, CaptureSettings};
use crate::config::SensorConfig;
use std::thread;

/// Result of one measurement
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Average power of channel 0 in dBFS, in `[-160, 0]`
    pub power_db: f32,
    /// SPL estimate derived from `power_db`
    pub spl_db: f64,
    /// Failures folded into this reading, in the order they happened
    pub faults: Vec<SensorError>,
}

impl Reading {
    fn new(power_db: f32, faults: Vec<SensorError>) -> Self {
        Self {
            power_db,
            spl_db: to_spl(power_db),
            faults,
        }
    }

    /// Reading used when nothing could be measured
    pub fn silence() -> Self {
        Self::new(SILENCE_FLOOR_DB, Vec::new())
    }

    /// Whether any step failed along the way
    pub fn is_degraded(&self) -> bool {
        !self.faults.is_empty()
    }

    /// Surface the first folded failure as an error
    pub fn into_result(self) -> Result<Self, SensorError> {
        match self.faults.first() {
            Some(fault) => Err(fault.clone()),
            None => Ok(self),
        }
    }
}

/// One open microphone capture, released on drop
pub struct MeasurementSession {
    capture: Option<Box<dyn CaptureSession>>,
    metering_enabled: bool,
}

impl MeasurementSession {
    /// Open a capture on `backend`
    pub fn open<B: AudioBackend + ?Sized>(
        backend: &B,
        settings: &CaptureSettings,
    ) -> Result<Self, SensorError> {
        let capture = backend
            .open_capture(settings)
            .map_err(SensorError::CaptureCreationFailed)?;

        Ok(Self {
            capture: Some(capture),
            metering_enabled: settings.metering_enabled,
        })
    }

    /// Whether the capture is still held
    pub fn is_active(&self) -> bool {
        self.capture.is_some()
    }

    /// Begin capture
    pub fn start(&mut self) -> Result<(), SensorError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or(SensorError::MeteringUnavailable)?;
        capture.record().map_err(SensorError::CaptureStartFailed)
    }

    /// Refresh the meters and read the average power of channel 0
    pub fn sample(&mut self) -> Result<f32, SensorError> {
        if !self.metering_enabled {
            return Err(SensorError::MeteringUnavailable);
        }

        let capture = self
            .capture
            .as_mut()
            .ok_or(SensorError::MeteringUnavailable)?;
        capture.update_meters();
        Ok(clamp_power(capture.average_power(0)))
    }

    /// Stop capture and drop the handle; later calls do nothing
    pub fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
            tracing::info!("Capture session released");
        }
    }
}

impl Drop for MeasurementSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// On-demand ambient noise sensor
pub struct NoiseLevelSensor<B: AudioBackend> {
    backend: B,
    config: SensorConfig,
}

impl<B: AudioBackend> NoiseLevelSensor<B> {
    /// Sensor with the default configuration
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, SensorConfig::default())
    }

    pub fn with_config(backend: B, config: SensorConfig) -> Self {
        Self { backend, config }
    }

    /// Take one measurement
    ///
    /// Never fails: acquisition, capture and metering failures all degrade
    /// to the silence floor and are listed in `Reading::faults`.
    pub fn measure(&self) -> Reading {
        let mut faults = Vec::new();

        for e in self.acquire() {
            tracing::warn!("{}, measuring anyway", e);
            faults.push(e);
        }

        let power = {
            let mut session = match MeasurementSession::open(&self.backend, &self.config.capture)
            {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("{}", e);
                    faults.push(e);
                    None
                }
            };

            if let Some(session) = session.as_mut() {
                if let Err(e) = session.start() {
                    tracing::warn!("{}", e);
                    faults.push(e);
                }
                if !self.config.settle.is_zero() {
                    thread::sleep(self.config.settle);
                }
            }

            let sampled = match session.as_mut() {
                Some(session) => session.sample(),
                None => Err(SensorError::MeteringUnavailable),
            };

            match sampled {
                Ok(power) => power,
                Err(e) => {
                    tracing::debug!("{}, using silence floor", e);
                    faults.push(e);
                    SILENCE_FLOOR_DB
                }
            }
            // session released here
        };

        let reading = Reading::new(power, faults);
        tracing::debug!(
            "Noise level: {:.1} dBFS ({:.1} dB SPL)",
            reading.power_db,
            reading.spl_db
        );
        reading
    }

    /// Configure and activate the shared audio session
    ///
    /// Both steps are attempted; activation does not depend on configuration.
    fn acquire(&self) -> Vec<SensorError> {
        let configured = self.backend.configure_session(&self.config.session);
        let activated = self.backend.activate_session();

        [configured, activated]
            .into_iter()
            .filter_map(|step| step.err().map(SensorError::AcquisitionFailed))
            .collect()
    }
}
