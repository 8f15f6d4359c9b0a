//! Runtime configuration
//!
//! Defaults reproduce the capture the host has always received. A few knobs
//! can be overridden from the environment.

use crate::audio::{CaptureSettings, SessionOptions};
use std::time::Duration;

/// Delay between starting capture and reading the meters, in milliseconds
pub const SETTLE_ENV: &str = "MOODSYNC_SETTLE_MS";

/// Upper bound on one bridged measurement, in milliseconds
pub const MEASURE_TIMEOUT_ENV: &str = "MOODSYNC_MEASURE_TIMEOUT_MS";

/// Configuration of the noise level sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// Applied to the shared audio session before each capture
    pub session: SessionOptions,
    /// Format of each capture session
    pub capture: CaptureSettings,
    /// Wait after `record()` before metering (none by default)
    pub settle: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            session: SessionOptions::default(),
            capture: CaptureSettings::default(),
            settle: Duration::ZERO,
        }
    }
}

impl SensorConfig {
    /// Defaults with `MOODSYNC_SETTLE_MS` applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(settle) = duration_from_env(SETTLE_ENV) {
            config.settle = settle;
        }
        config
    }
}

/// Configuration of the host bridge
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// A measurement taking longer than this answers with the silence floor
    pub measure_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            measure_timeout: Duration::from_secs(5),
        }
    }
}

impl BridgeConfig {
    /// Defaults with `MOODSYNC_MEASURE_TIMEOUT_MS` applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(timeout) = duration_from_env(MEASURE_TIMEOUT_ENV) {
            config.measure_timeout = timeout;
        }
        config
    }
}

fn duration_from_env(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    parse_millis(&raw).or_else(|| {
        tracing::warn!("Ignoring {}={:?}: expected milliseconds", key, raw);
        None
    })
}

fn parse_millis(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sensor_takes_no_settle_delay() {
        assert_eq!(SensorConfig::default().settle, Duration::ZERO);
    }

    #[test]
    fn parses_milliseconds() {
        assert_eq!(parse_millis("250"), Some(Duration::from_millis(250)));
        assert_eq!(parse_millis(" 0 "), Some(Duration::ZERO));
    }

    // Each test owns one variable so they can run in parallel
    #[test]
    fn sensor_settle_from_env() {
        std::env::set_var(SETTLE_ENV, "30");
        assert_eq!(SensorConfig::from_env().settle, Duration::from_millis(30));

        std::env::set_var(SETTLE_ENV, "soon");
        assert_eq!(SensorConfig::from_env(), SensorConfig::default());

        std::env::remove_var(SETTLE_ENV);
        assert_eq!(SensorConfig::from_env(), SensorConfig::default());
    }

    #[test]
    fn bridge_timeout_from_env() {
        std::env::set_var(MEASURE_TIMEOUT_ENV, "750");
        assert_eq!(
            BridgeConfig::from_env().measure_timeout,
            Duration::from_millis(750)
        );

        std::env::set_var(MEASURE_TIMEOUT_ENV, "1.5s");
        assert_eq!(BridgeConfig::from_env(), BridgeConfig::default());

        std::env::remove_var(MEASURE_TIMEOUT_ENV);
        assert_eq!(BridgeConfig::from_env(), BridgeConfig::default());
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert_eq!(parse_millis("fast"), None);
        assert_eq!(parse_millis("-5"), None);
        assert_eq!(parse_millis(""), None);
    }
}
