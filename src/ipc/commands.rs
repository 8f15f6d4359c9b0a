//! Sensor channels exposed to the host
//!
//! `microphone_data` answers `getNoiseLevel`; `camera_data` is kept for
//! compatibility and answers every call with `NotImplemented`.

use super::channel::{Bridge, MethodCall, MethodChannel, MethodResponse};
use crate::audio::AudioBackend;
use crate::config::{BridgeConfig, SensorConfig};
use crate::sensor::{NoiseLevelSensor, Reading};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const MICROPHONE_CHANNEL: &str = "microphone_data";
pub const CAMERA_CHANNEL: &str = "camera_data";

pub const GET_NOISE_LEVEL: &str = "getNoiseLevel";
pub const GET_AMBIENT_LIGHT_LEVEL: &str = "getAmbientLightLevel";

/// Value the host receives for a reading
///
/// The host has always been given the raw channel power in dBFS, not the
/// SPL estimate; `Reading::spl_db` stays available to Rust callers.
pub fn noise_level_value(reading: &Reading) -> f64 {
    f64::from(reading.power_db)
}

/// Shared state behind the microphone channel
pub struct SensorState<B: AudioBackend> {
    /// Locked for the whole measurement so captures never overlap
    pub sensor: Arc<Mutex<NoiseLevelSensor<B>>>,
    pub config: BridgeConfig,
}

impl<B: AudioBackend + 'static> SensorState<B> {
    pub fn new(sensor: NoiseLevelSensor<B>, config: BridgeConfig) -> Self {
        Self {
            sensor: Arc::new(Mutex::new(sensor)),
            config,
        }
    }
}

/// Measure the ambient noise level
///
/// Runs the blocking measurement off the async runtime and bounds it by
/// `BridgeConfig::measure_timeout`. A timed-out measurement answers with the
/// silence floor; its capture is still released when the blocking call ends.
pub async fn get_noise_level<B: AudioBackend + 'static>(state: &SensorState<B>) -> MethodResponse {
    let sensor = Arc::clone(&state.sensor).lock_owned().await;
    let task = tokio::task::spawn_blocking(move || sensor.measure());

    match tokio::time::timeout(state.config.measure_timeout, task).await {
        Ok(Ok(reading)) => {
            for fault in &reading.faults {
                tracing::debug!("Folded into reading: {}", fault);
            }
            MethodResponse::success(noise_level_value(&reading))
        }
        Ok(Err(e)) => {
            tracing::error!("Noise measurement aborted: {}", e);
            MethodResponse::error("SENSOR_PANIC", e.to_string())
        }
        Err(_) => {
            tracing::warn!(
                "Noise measurement exceeded {:?}, answering silence floor",
                state.config.measure_timeout
            );
            MethodResponse::success(noise_level_value(&Reading::silence()))
        }
    }
}

/// Ambient light is no longer measured
pub async fn get_ambient_light_level() -> MethodResponse {
    MethodResponse::NotImplemented
}

/// `microphone_data` channel
pub struct MicrophoneChannel<B: AudioBackend> {
    state: SensorState<B>,
}

impl<B: AudioBackend + 'static> MicrophoneChannel<B> {
    pub fn new(state: SensorState<B>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl<B: AudioBackend + 'static> MethodChannel for MicrophoneChannel<B> {
    fn name(&self) -> &str {
        MICROPHONE_CHANNEL
    }

    async fn handle(&self, call: MethodCall) -> MethodResponse {
        match call.method.as_str() {
            GET_NOISE_LEVEL => get_noise_level(&self.state).await,
            _ => MethodResponse::NotImplemented,
        }
    }
}

/// `camera_data` channel
#[derive(Debug, Default)]
pub struct CameraChannel;

#[async_trait]
impl MethodChannel for CameraChannel {
    fn name(&self) -> &str {
        CAMERA_CHANNEL
    }

    async fn handle(&self, call: MethodCall) -> MethodResponse {
        match call.method.as_str() {
            GET_AMBIENT_LIGHT_LEVEL => get_ambient_light_level().await,
            _ => MethodResponse::NotImplemented,
        }
    }
}

/// Bridge with both sensor channels registered
pub fn sensor_bridge<B: AudioBackend + 'static>(
    backend: B,
    sensor_config: SensorConfig,
    bridge_config: BridgeConfig,
) -> Bridge {
    let sensor = NoiseLevelSensor::with_config(backend, sensor_config);
    let mut bridge = Bridge::new();
    bridge
        .register(MicrophoneChannel::new(SensorState::new(sensor, bridge_config)))
        .register(CameraChannel);
    bridge
}
