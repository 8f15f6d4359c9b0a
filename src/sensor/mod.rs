//! Noise level sensor
//!
//! One microphone capture per measurement, released before the call returns.

mod error;
mod noise;
mod spl;

pub use error::SensorError;
pub use noise::{MeasurementSession, NoiseLevelSensor, Reading};
pub use spl::{to_spl, REFERENCE_DB, SILENCE_FLOOR_DB};
