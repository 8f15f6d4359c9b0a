//! Host bridge
//!
//! Named channels answering method calls from the host application.

mod channel;
mod commands;

pub use channel::{Bridge, MethodCall, MethodChannel, MethodResponse};
pub use commands::{
    get_ambient_light_level, get_noise_level, noise_level_value, sensor_bridge, CameraChannel,
    MicrophoneChannel, SensorState, CAMERA_CHANNEL, GET_AMBIENT_LIGHT_LEVEL, GET_NOISE_LEVEL,
    MICROPHONE_CHANNEL,
};
