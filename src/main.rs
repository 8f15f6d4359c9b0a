//! MoodSync sensors - bootstrap
//!
//! Builds the host bridge on the default input device and answers one
//! request per channel, printing the responses.

use moodsync_sensors::audio::{
    shared_session_active, shared_session_options, AudioBackend, CpalBackend,
};
use moodsync_sensors::ipc::{
    sensor_bridge, MethodCall, CAMERA_CHANNEL, GET_AMBIENT_LIGHT_LEVEL, GET_NOISE_LEVEL,
    MICROPHONE_CHANNEL,
};
use moodsync_sensors::{BridgeConfig, SensorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodsync_sensors=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("MoodSync sensors v{}", env!("CARGO_PKG_VERSION"));

    let backend = CpalBackend::new();
    let devices = backend.list_devices();
    tracing::info!("Input devices: {:?}", devices);

    let bridge = sensor_bridge(backend, SensorConfig::from_env(), BridgeConfig::from_env());
    tracing::info!("Channels: {:?}", bridge.channel_names());

    let requests = [
        (MICROPHONE_CHANNEL, GET_NOISE_LEVEL),
        (CAMERA_CHANNEL, GET_AMBIENT_LIGHT_LEVEL),
    ];

    for (channel, method) in requests {
        let response = bridge.invoke(channel, MethodCall::new(method)).await;
        println!("{}::{} -> {}", channel, method, serde_json::to_string(&response)?);
    }

    // The shared session is left as the last measurement configured it
    tracing::debug!(
        "Audio session active: {}, options: {:?}",
        shared_session_active(),
        shared_session_options()
    );

    Ok(())
}
