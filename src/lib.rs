//! MoodSync sensors
//!
//! On-demand ambient noise measurement from the device microphone, exposed
//! to the host application through a request/response bridge.

pub mod audio;
pub mod config;
pub mod ipc;
pub mod sensor;

pub use config::{BridgeConfig, SensorConfig};
pub use sensor::{NoiseLevelSensor, Reading, SensorError};
